use crate::convert::ConvertError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data (malformed multipart, bad field values, ...)
    #[error("{message}")]
    BadRequest { message: String },

    /// No file part, or more than one file under the expected field name
    #[error("expected exactly one file under the 'file' field")]
    MissingFile,

    /// Declared MIME type is not a JPEG/JFIF image
    #[error("unsupported file type '{content_type}': only JPEG and JFIF images are accepted")]
    UnsupportedType { content_type: String },

    /// Upload exceeds the configured size limit
    #[error("file exceeds the maximum upload size of {limit} bytes ({} MiB)", .limit / (1024 * 1024))]
    FileTooLarge { limit: u64 },

    /// Spooled upload vanished or was empty when read back
    #[error("uploaded file is empty or could not be read")]
    EmptyOrMissingFile,

    /// Conversion pipeline failure, classified by the pipeline itself
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Generic internal service error
    #[error("failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. }
            | Error::MissingFile
            | Error::UnsupportedType { .. }
            | Error::FileTooLarge { .. }
            | Error::EmptyOrMissingFile => StatusCode::BAD_REQUEST,
            Error::Convert(convert_err) => match convert_err {
                // The uploaded bytes were not a decodable image: the client can fix this
                ConvertError::Decode(_) => StatusCode::BAD_REQUEST,
                ConvertError::Dimensions { .. } => StatusCode::BAD_REQUEST,
                ConvertError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::MissingFile
            | Error::UnsupportedType { .. }
            | Error::FileTooLarge { .. }
            | Error::EmptyOrMissingFile => self.to_string(),
            Error::Convert(convert_err) => match convert_err {
                ConvertError::Decode(_) => "uploaded file is not a decodable JPEG image".to_string(),
                ConvertError::Dimensions { .. } => convert_err.to_string(),
                ConvertError::Encode(_) => "Internal server error".to_string(),
            },
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Internal { .. } | Error::Other(_) | Error::Convert(ConvertError::Encode(_)) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Convert(_) => {
                tracing::info!("Conversion rejected: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = json!({ "error": self.user_message() });
        (status, Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        for err in [
            Error::MissingFile,
            Error::UnsupportedType {
                content_type: "text/plain".into(),
            },
            Error::FileTooLarge { limit: 10 * 1024 * 1024 },
            Error::EmptyOrMissingFile,
            Error::BadRequest {
                message: "quality must be an integer between 10 and 100".into(),
            },
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = Error::Other(anyhow::anyhow!("tempdir permissions: /var/tmp/xyz"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn too_large_message_reports_limit_in_mib() {
        let err = Error::FileTooLarge { limit: 10 * 1024 * 1024 };
        assert!(err.user_message().contains("10 MiB"));
    }
}
