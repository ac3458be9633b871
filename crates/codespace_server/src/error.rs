use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use codespace_core::protocol::ErrorResponse;
use codespace_core::{CodespaceError, ErrorKind};
use tracing::error;

/// A failed HTTP request, rendered as a status code and a `{ "msg": ... }` body
#[derive(Debug)]
pub struct ApiError(pub CodespaceError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::ValidationError | ErrorKind::DisallowedCommand => StatusCode::BAD_REQUEST,
            ErrorKind::FileExists => StatusCode::CONFLICT,
            ErrorKind::StoreWriteFailure | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CodespaceError> for ApiError {
    fn from(err: CodespaceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                msg: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Result type for HTTP handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
