//! Categorized feed routes.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::NaiveDate;
use db::models::feed_post::{FeedPost, FeedPostWithAuthor};
use serde::{Deserialize, Serialize};
use services::services::feed::{FeedFilter, FeedService};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFeedMessage {
    pub category: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateFeedMessage {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedListQuery {
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
}

pub async fn create_post(
    State(state): State<AppState>,
    AuthUser(author): AuthUser,
    Path(resident_id): Path<Uuid>,
    axum::Json(payload): axum::Json<CreateFeedMessage>,
) -> Result<ResponseJson<ApiResponse<FeedPost>>, ApiError> {
    let post = FeedService::post(
        &state.db.pool,
        resident_id,
        author.id,
        &payload.category,
        &payload.message,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        post,
        "Message posted successfully.",
    )))
}

pub async fn list_posts(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(resident_id): Path<Uuid>,
    Query(query): Query<FeedListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<FeedPostWithAuthor>>>, ApiError> {
    let filter = FeedFilter {
        category: query.category,
        date: query.date,
    };
    let posts = FeedService::list(&state.db.pool, resident_id, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(posts)))
}

pub async fn update_post(
    State(state): State<AppState>,
    AuthUser(editor): AuthUser,
    Path(post_id): Path<Uuid>,
    axum::Json(payload): axum::Json<UpdateFeedMessage>,
) -> Result<ResponseJson<ApiResponse<FeedPost>>, ApiError> {
    let post = FeedService::update(&state.db.pool, post_id, editor.id, &payload.message).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        post,
        "Message updated successfully.",
    )))
}

pub async fn delete_post(
    State(state): State<AppState>,
    AuthUser(editor): AuthUser,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    FeedService::delete(&state.db.pool, post_id, editor.id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Message deleted successfully.",
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/residents/{resident_id}/feed",
            Router::new().route("/", get(list_posts).post(create_post)),
        )
        .nest(
            "/feed",
            Router::new().route("/{post_id}", put(update_post).delete(delete_post)),
        )
}
