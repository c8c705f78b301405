use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType};
use thiserror::Error;

use crate::gpio::AllowList;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid GPIO pin {pin}, choose one of: {allowed}")]
    InvalidPin { pin: String, allowed: AllowList },
    #[error("Invalid delay {0} (use 1ms, 1s, 1m, 1h)")]
    InvalidDelay(String),
    #[error("Invalid action {0}, choose one of: timer, toggle")]
    InvalidAction(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Access denied")]
    Unauthorized,
    #[error("GPIO hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("GPIO I/O error: {0}")]
    Io(String),
    #[error("Shutdown in progress: {0}")]
    ShutdownInProgress(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Rejected before any hardware access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::InvalidPin { .. }
                | AppError::InvalidDelay(_)
                | AppError::InvalidAction(_)
                | AppError::InvalidQuery(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidPin { .. }
            | AppError::InvalidDelay(_)
            | AppError::InvalidAction(_)
            | AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::HardwareUnavailable(_) | AppError::ShutdownInProgress(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Io(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }
}
