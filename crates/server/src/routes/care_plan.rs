//! Care-plan read and merge routes.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::care_plan::{CarePlanResponse, UpdateCarePlan};
use services::services::care_plan::CarePlanService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

pub async fn get_care_plan(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(resident_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CarePlanResponse>>, ApiError> {
    let plan = CarePlanService::get(&state.db.pool, resident_id).await?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

pub async fn update_care_plan(
    State(state): State<AppState>,
    AuthUser(editor): AuthUser,
    Path(resident_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateCarePlan>,
) -> Result<ResponseJson<ApiResponse<CarePlanResponse>>, ApiError> {
    let plan =
        CarePlanService::apply_partial_update(&state.db.pool, resident_id, editor.id, &payload)
            .await?;
    Ok(ResponseJson(ApiResponse::success(plan)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/residents/{resident_id}/care-plan",
        Router::new().route("/", get(get_care_plan).put(update_care_plan)),
    )
}
