use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::ActionError;
use crate::services::lister::ListError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("per-page must be positive, got {0}")]
    InvalidPerPage(i64),

    #[error(transparent)]
    Store(StoreError),
}

impl From<ActionError> for AppError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::Unauthorized => AppError::Unauthorized,
            ActionError::Unauthenticated => AppError::Unauthenticated,
            ActionError::UnknownAction(action) => AppError::UnknownAction(action),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("booking {id}")),
            other => AppError::Store(other),
        }
    }
}

impl From<ListError> for AppError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::InvalidPerPage(n) => AppError::InvalidPerPage(n),
            ListError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidPerPage(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::IllegalStatus(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
