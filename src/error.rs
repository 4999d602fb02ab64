//! Error types for the Protoserve service.
//!
//! [`ServiceError`] covers startup and transport failures. [`AppError`] is the
//! error every RPC handler and middleware stage returns; it carries an
//! [`ErrorCode`] that knows its machine-readable id, HTTP status and gRPC code,
//! and is translated only at the transport boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tonic::metadata::MetadataValue;

/// Metadata / header carrying the machine-readable error id.
pub const ERROR_CODE_HEADER: &str = "x-error-code";

/// Main error type for Protoserve infrastructure operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// gRPC transport errors
    #[error("gRPC error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Tracing / metrics initialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

/// Result type alias for Protoserve operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Catalogue of error codes surfaced to callers.
///
/// Ids follow the `ERR<http status>P<nn>` pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Internal,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Unavailable,
    DataLoss,
    Unauthenticated,
    UserNotFound,
    UserEmailExists,
    InvalidUserData,
}

impl ErrorCode {
    /// Machine-readable id.
    pub fn id(&self) -> &'static str {
        self.entry().0
    }

    /// HTTP status used by the gateway.
    pub fn http_status(&self) -> u16 {
        self.entry().1
    }

    /// gRPC status code used by the gRPC server.
    pub fn grpc_code(&self) -> tonic::Code {
        self.entry().2
    }

    /// Default human-readable message.
    pub fn message(&self) -> &'static str {
        self.entry().3
    }

    fn entry(&self) -> (&'static str, u16, tonic::Code, &'static str) {
        use tonic::Code;

        match self {
            ErrorCode::Internal => ("ERR500P00", 500, Code::Internal, "internal server error"),
            ErrorCode::Cancelled => ("ERR499P01", 499, Code::Cancelled, "request cancelled"),
            ErrorCode::Unknown => ("ERR500P02", 500, Code::Unknown, "unknown error"),
            ErrorCode::InvalidArgument => {
                ("ERR400P03", 400, Code::InvalidArgument, "invalid argument")
            }
            ErrorCode::DeadlineExceeded => {
                ("ERR504P04", 504, Code::DeadlineExceeded, "deadline exceeded")
            }
            ErrorCode::NotFound => ("ERR404P05", 404, Code::NotFound, "not found"),
            ErrorCode::AlreadyExists => ("ERR409P06", 409, Code::AlreadyExists, "already exists"),
            ErrorCode::PermissionDenied => {
                ("ERR403P07", 403, Code::PermissionDenied, "permission denied")
            }
            ErrorCode::ResourceExhausted => {
                ("ERR429P08", 429, Code::ResourceExhausted, "resource exhausted")
            }
            ErrorCode::FailedPrecondition => {
                ("ERR400P09", 400, Code::FailedPrecondition, "failed precondition")
            }
            ErrorCode::Aborted => ("ERR409P10", 409, Code::Aborted, "aborted"),
            ErrorCode::OutOfRange => ("ERR400P11", 400, Code::OutOfRange, "out of range"),
            ErrorCode::Unimplemented => ("ERR501P12", 501, Code::Unimplemented, "unimplemented"),
            ErrorCode::Unavailable => ("ERR503P14", 503, Code::Unavailable, "service unavailable"),
            ErrorCode::DataLoss => ("ERR500P15", 500, Code::DataLoss, "data loss"),
            ErrorCode::Unauthenticated => {
                ("ERR401P16", 401, Code::Unauthenticated, "unauthenticated")
            }
            ErrorCode::UserNotFound => ("ERR404P17", 404, Code::NotFound, "user not found"),
            ErrorCode::UserEmailExists => (
                "ERR409P18",
                409,
                Code::AlreadyExists,
                "user with email already exists",
            ),
            ErrorCode::InvalidUserData => {
                ("ERR400P19", 400, Code::InvalidArgument, "invalid user data")
            }
        }
    }
}

/// A domain error with a catalogue code and a caller-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
}

impl AppError {
    /// Create an error carrying the code's default message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
        }
    }

    /// Create an error whose message is `"<default message>: <detail>"`.
    pub fn with_message(code: ErrorCode, detail: impl std::fmt::Display) -> Self {
        Self {
            code,
            message: format!("{}: {}", code.message(), detail),
        }
    }

    /// The rejection returned when a caller exceeds the configured rate.
    pub fn rate_limited(requests_per_second: u32) -> Self {
        Self {
            code: ErrorCode::ResourceExhausted,
            message: format!(
                "Rate limit exceeded. Maximum {} requests per second allowed.",
                requests_per_second
            ),
        }
    }

    /// Shorthand for an internal error with context.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::with_message(ErrorCode::Internal, detail)
    }

    /// Shorthand for a validation failure.
    pub fn validation(reason: impl std::fmt::Display) -> Self {
        Self::with_message(
            ErrorCode::InvalidArgument,
            format!("validation failed: {}", reason),
        )
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error carries the given code.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl From<AppError> for tonic::Status {
    fn from(err: AppError) -> Self {
        let mut status = tonic::Status::new(err.code.grpc_code(), err.message);
        status
            .metadata_mut()
            .insert(ERROR_CODE_HEADER, MetadataValue::from_static(err.code.id()));
        status
    }
}

/// JSON body rendered by the HTTP gateway for failed calls.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorBody {
            code: self.code.id(),
            message: &self.message,
        });
        (status, [(ERROR_CODE_HEADER, self.code.id())], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message() {
        let err = AppError::rate_limited(2);
        assert_eq!(err.code(), ErrorCode::ResourceExhausted);
        assert_eq!(
            err.message(),
            "Rate limit exceeded. Maximum 2 requests per second allowed."
        );
        assert_eq!(err.code().http_status(), 429);
        assert_eq!(err.code().id(), "ERR429P08");
    }

    #[test]
    fn test_with_message_prefixes_default() {
        let err = AppError::with_message(ErrorCode::UserNotFound, "id 7");
        assert_eq!(err.message(), "user not found: id 7");
        assert!(err.is(ErrorCode::UserNotFound));
    }

    #[test]
    fn test_status_conversion_keeps_code_and_id() {
        let status: tonic::Status = AppError::rate_limited(5).into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
        assert_eq!(
            status.message(),
            "Rate limit exceeded. Maximum 5 requests per second allowed."
        );
        let id = status.metadata().get(ERROR_CODE_HEADER).unwrap();
        assert_eq!(id.to_str().unwrap(), "ERR429P08");
    }

    #[test]
    fn test_user_codes_map_to_grpc_codes() {
        assert_eq!(ErrorCode::UserNotFound.grpc_code(), tonic::Code::NotFound);
        assert_eq!(
            ErrorCode::UserEmailExists.grpc_code(),
            tonic::Code::AlreadyExists
        );
        assert_eq!(ErrorCode::InvalidUserData.http_status(), 400);
    }

    #[test]
    fn test_into_response_uses_http_status() {
        let response = AppError::new(ErrorCode::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let id = response.headers().get(ERROR_CODE_HEADER).unwrap();
        assert_eq!(id.to_str().unwrap(), "ERR404P05");
    }
}
