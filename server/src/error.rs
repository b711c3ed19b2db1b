//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"message": "..."}` with the status
//! code the store error implies. Storage faults are logged here since the
//! client only ever sees a generic 500.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use todo_core::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The body was not JSON of the expected shape.
    #[error("invalid request body: {0}")]
    Body(#[from] JsonRejection),

    /// The `:id` segment was not a todo id; no such resource can exist.
    #[error("Not Found")]
    Path(#[from] PathRejection),

    #[error("Not Found")]
    RouteNotFound,

    /// The blocking task running a store operation panicked or was aborted.
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::InvalidInput(_)) | ApiError::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::NotFound(_)) | ApiError::Path(_) | ApiError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::StorageFailure(_))
            | ApiError::Store(StoreError::StorageUnavailable(_))
            | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
