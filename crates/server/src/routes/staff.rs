//! Staff administration routes and the pending-approvals flag.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::models::user::StaffMember;
use serde::{Deserialize, Serialize};
use services::services::staff::StaffService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, AuthUser},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct StaffListResponse {
    pub staff_members: Vec<StaffMember>,
    pub new_notifications: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct NotificationsResponse {
    pub new_notifications: bool,
}

pub async fn list_staff(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<ResponseJson<ApiResponse<StaffListResponse>>, ApiError> {
    let staff_members = StaffService::list(&state.db.pool, caller.id).await?;
    let new_notifications = StaffService::pending_approvals(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(StaffListResponse {
        staff_members,
        new_notifications,
    })))
}

pub async fn notifications(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<ResponseJson<ApiResponse<NotificationsResponse>>, ApiError> {
    let new_notifications = StaffService::pending_approvals(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(NotificationsResponse {
        new_notifications,
    })))
}

pub async fn approve_staff(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<StaffMember>>, ApiError> {
    let member = StaffService::approve(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        member,
        "Regular staff approved successfully.",
    )))
}

pub async fn decline_staff(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    StaffService::decline(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Regular staff declined successfully.",
    )))
}

pub async fn remove_staff(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    StaffService::remove(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Staff deleted successfully.",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/staff",
            Router::new()
                .route("/", get(list_staff))
                .route("/{user_id}/approve", put(approve_staff))
                .route("/{user_id}/decline", post(decline_staff))
                .route("/{user_id}", delete(remove_staff)),
        )
        .route("/notifications", get(notifications))
}
