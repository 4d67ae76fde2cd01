//! Resident listing and admin-only lifecycle routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::resident::{CreateResident, Resident};
use serde::{Deserialize, Serialize};
use services::services::resident::ResidentService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateIconRequest {
    pub icon: Option<String>,
}

pub async fn list_residents(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Resident>>>, ApiError> {
    let residents = ResidentService::list(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(residents)))
}

pub async fn create_resident(
    State(state): State<AppState>,
    _admin: AdminUser,
    axum::Json(payload): axum::Json<CreateResident>,
) -> Result<ResponseJson<ApiResponse<Resident>>, ApiError> {
    let resident = ResidentService::create(&state.db.pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        resident,
        "New resident created successfully.",
    )))
}

pub async fn delete_resident(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(resident_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ResidentService::delete(&state.db.pool, resident_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Resident deleted successfully.",
    )))
}

pub async fn update_icon(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(resident_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateIconRequest>,
) -> Result<ResponseJson<ApiResponse<Resident>>, ApiError> {
    let resident =
        ResidentService::update_icon(&state.db.pool, resident_id, payload.icon.as_deref()).await?;
    Ok(ResponseJson(ApiResponse::success(resident)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/residents",
        Router::new()
            .route("/", get(list_residents).post(create_resident))
            .route("/{resident_id}", axum::routing::delete(delete_resident))
            .route("/{resident_id}/icon", put(update_icon)),
    )
}
