use crate::services::drive::DriveError;
use crate::utils::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const ERROR_PREFIX: &str = "Error al procesar CSV";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("body is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("invalid filename: {0}")]
    InvalidFilename(#[from] ValidationError),

    #[error("could not stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error(transparent)]
    Drive(#[from] DriveError),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Decode(_) => "decode",
            AppError::InvalidFilename(_) => "filename",
            AppError::Staging(_) => "staging",
            AppError::Drive(e) => e.kind(),
        }
    }
}

// Every failure is a 500 with a plain-text message; callers rely on that.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match &self {
            AppError::Decode(_) | AppError::InvalidFilename(_) => {
                tracing::warn!(kind, "❌ {}: {}", ERROR_PREFIX, self);
            }
            AppError::Staging(_) | AppError::Drive(_) => {
                tracing::error!(kind, "❌ {}: {}", ERROR_PREFIX, self);
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: {}", ERROR_PREFIX, self),
        )
            .into_response()
    }
}
