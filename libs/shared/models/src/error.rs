use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Slot no longer available: {0}")]
    SlotNoLongerAvailable(String),

    #[error("Invalid status transition: {0}")]
    InvalidStatusTransition(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable rejection kind carried in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::SlotNoLongerAvailable(_) => "slot_no_longer_available",
            AppError::InvalidStatusTransition(_) => "invalid_status_transition",
            AppError::Persistence(_) => "persistence_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SlotNoLongerAvailable(_) => StatusCode::CONFLICT,
            AppError::InvalidStatusTransition(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::SlotNoLongerAvailable(_) | AppError::Persistence(_))
    }

    fn message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidRequest(msg)
            | AppError::SlotNoLongerAvailable(msg)
            | AppError::InvalidStatusTransition(msg)
            | AppError::Persistence(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self.message());
        } else {
            tracing::warn!("Rejected: {}: {}", status, self.message());
        }

        let mut body = json!({
            "error": self.kind(),
            "message": self.message(),
            "retryable": self.is_retryable(),
        });

        if let AppError::SlotNoLongerAvailable(_) = self {
            body["action"] = json!("refetch_availability");
        }

        (status, Json(body)).into_response()
    }
}
