use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, ProfileResponse,
            RegisterRequest, ResetPasswordRequest, UpdateProfileRequest, UpdateProfileResponse,
            VerifyRequest,
        },
        extractors::AuthUser,
        services::AuthWorkflow,
    },
    error::ApiResult,
    extract::Json,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/profile", put(update_profile))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthWorkflow>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    auth.register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok(Json(MessageResponse::new(
        "Registration successful. Please check your email to verify your account.",
    )))
}

#[instrument(skip_all)]
pub async fn verify(
    State(auth): State<AuthWorkflow>,
    Json(payload): Json<VerifyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    auth.verify_email(&payload.token).await?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthWorkflow>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let res = auth.login(&payload.email, &payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip(state, auth, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    State(auth): State<AuthWorkflow>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    auth.forgot_password(&payload.email).await?;
    let message = if state.config.uniform_forgot_password {
        "If an account exists for that email, a password reset link has been sent."
    } else {
        "Password reset link sent to your email."
    };
    Ok(Json(MessageResponse::new(message)))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(auth): State<AuthWorkflow>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    auth.reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successfully")))
}

#[instrument(skip(auth))]
pub async fn me(
    State(auth): State<AuthWorkflow>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = auth.profile(user.id).await?;
    Ok(Json(profile.into()))
}

#[instrument(skip(auth, payload))]
pub async fn update_profile(
    State(auth): State<AuthWorkflow>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    let updated = auth.update_profile(user.id, payload).await?;
    Ok(Json(UpdateProfileResponse {
        message: "Profile updated".into(),
        user: updated.into(),
    }))
}
