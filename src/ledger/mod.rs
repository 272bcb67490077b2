use crate::state::AppState;
use axum::Router;

pub mod aggregate;
mod handlers;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
