use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AdminUser,
    error::ApiResult,
    extract::{Json, Path},
    state::AppState,
    users::{
        dto::{UpdateUserRequest, UpdateUserResponse, UserSummary},
        services::UserAdmin,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", put(update_user))
}

#[instrument(skip(admin_svc))]
async fn list_users(
    State(admin_svc): State<UserAdmin>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<UserSummary>>> {
    Ok(Json(admin_svc.list().await?))
}

#[instrument(skip(admin_svc))]
async fn update_user(
    State(admin_svc): State<UserAdmin>,
    AdminUser(actor): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UpdateUserResponse>> {
    let row_count = admin_svc.update(actor.id, id, payload).await?;
    Ok(Json(UpdateUserResponse {
        message: "User updated",
        row_count,
    }))
}
