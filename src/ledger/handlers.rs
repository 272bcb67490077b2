use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    extract::{Json, Query},
    ledger::{
        aggregate::{Dashboard, Summary},
        services::Ledger,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/summary", get(summary))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
}

#[instrument(skip(ledger))]
async fn dashboard(State(ledger): State<Ledger>, user: AuthUser) -> ApiResult<Json<Dashboard>> {
    let today = OffsetDateTime::now_utc().date();
    Ok(Json(ledger.dashboard(user.id, today).await?))
}

/// Defaults to the current month.
#[instrument(skip(ledger))]
async fn summary(
    State(ledger): State<Ledger>,
    user: AuthUser,
    Query(q): Query<SummaryQuery>,
) -> ApiResult<Json<Summary>> {
    let today = OffsetDateTime::now_utc().date();
    let year = q.year.unwrap_or(today.year());
    let month = q.month.unwrap_or(u8::from(today.month()));
    Ok(Json(ledger.summary(user.id, year, month).await?))
}
