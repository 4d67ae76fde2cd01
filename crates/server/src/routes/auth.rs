//! Registration, login and profile routes.

use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::post,
};
use db::models::user::StaffMember;
use serde::{Deserialize, Serialize};
use services::services::auth::{AuthService, RegisterStaff};
use services::services::staff::StaffService;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RegisterResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginResponse {
    pub token: String,
    pub user: StaffMember,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdatePasswordRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateProfileRequest {
    pub fullname: String,
    pub icon: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<RegisterStaff>,
) -> Result<ResponseJson<ApiResponse<RegisterResponse>>, ApiError> {
    let user = AuthService::register(&state.db.pool, &payload).await?;
    let token = state.token_keys.mint(user.id)?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        RegisterResponse { token },
        "Registration successful. Await admin approval.",
    )))
}

pub async fn login(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, ApiError> {
    let user = AuthService::login(&state.db.pool, &payload.username, &payload.password).await?;
    let token = state.token_keys.mint(user.id)?;
    Ok(ResponseJson(ApiResponse::success(LoginResponse {
        token,
        user: user.into(),
    })))
}

pub async fn update_password(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<UpdatePasswordRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    AuthService::update_password(&state.db.pool, &payload.username, &payload.password).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Password changed successfully.",
    )))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    axum::Json(payload): axum::Json<UpdateProfileRequest>,
) -> Result<ResponseJson<ApiResponse<StaffMember>>, ApiError> {
    let updated = StaffService::update_profile(
        &state.db.pool,
        user.id,
        &payload.fullname,
        payload.icon.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/update-password", post(update_password))
            .route("/update-profile", post(update_profile)),
    )
}
