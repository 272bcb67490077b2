use crate::state::AppState;
use axum::Router;

pub mod dto;
mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::entry_routes())
        .merge(handlers::shopping_routes())
        .merge(handlers::category_routes())
}
