//! JSON error envelope for API responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use saldo_core::ledger::LedgerError;
use saldo_shared::AppError;

/// API error wrapper rendering the engine taxonomy as JSON.
#[derive(Debug)]
pub enum ApiError {
    /// An engine error with its own code and status.
    Ledger(LedgerError),
    /// A request-level error (bad parameters, unparsable values).
    App(AppError),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl ApiError {
    /// Shorthand for a 400 with a message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::App(AppError::Validation(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Ledger(err) => {
                if err.http_status_code() >= 500 {
                    error!(error = %err, "internal error serving request");
                }
                (err.http_status_code(), err.error_code(), err.to_string())
            }
            Self::App(err) => (err.status_code(), err.error_code(), err.to_string()),
        };

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Internal details stay in the logs, not in the response body.
        let message = if status.is_server_error() {
            "An internal error occurred".to_string()
        } else {
            message
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
