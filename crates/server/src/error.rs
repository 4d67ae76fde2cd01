use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    auth::AuthError, care_plan::CarePlanError, feed::FeedError, resident::ResidentError,
    staff::StaffError,
};
use thiserror::Error;
use utils::{jwt::TokenError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized request")]
    Unauthorized,
    #[error("admin access required")]
    AdminRequired,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    CarePlan(#[from] CarePlanError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Resident(#[from] ResidentError),
    #[error(transparent)]
    Staff(#[from] StaffError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::Auth(err) => match err {
                AuthError::UsernameTaken => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::PendingApproval => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Hash(_) | AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::CarePlan(err) => match err {
                CarePlanError::NotFound | CarePlanError::EditorNotFound => StatusCode::NOT_FOUND,
                CarePlanError::Conflict => StatusCode::CONFLICT,
                CarePlanError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Feed(err) => match err {
                FeedError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
                FeedError::ResidentNotFound
                | FeedError::PostNotFound
                | FeedError::AuthorNotFound => StatusCode::NOT_FOUND,
                FeedError::NotAuthor | FeedError::NotApproved => StatusCode::FORBIDDEN,
                FeedError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Resident(err) => match err {
                ResidentError::NotFound => StatusCode::NOT_FOUND,
                ResidentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Staff(err) => match err {
                StaffError::NotFound => StatusCode::NOT_FOUND,
                StaffError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Token(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "internal error");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
