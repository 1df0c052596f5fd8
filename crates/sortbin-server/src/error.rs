use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use sortbin_link::LinkError;
use sortbin_store::StoreError;

/// Failure surfaced by an HTTP handler, mapped to a status code and a
/// JSON error body.
#[derive(Debug)]
pub enum ApiError {
    Link(LinkError),
    Store(StoreError),
    BadRequest(String),
    NotFound(String),
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        Self::Link(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Link(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Link(LinkError::ConnectionWriteFailure { .. }) => StatusCode::BAD_GATEWAY,
            Self::Link(_) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Link(err) => err.to_string(),
            Self::Store(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}
