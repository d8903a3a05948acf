// src/error.rs
use crate::schema::Violation;
use crate::web::types::StandardErrorResponse;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Failure categories shared by the server and the client.
///
/// Serialized as the `error_code` field of every error body, so the client can
/// branch on the kind instead of scanning the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthenticated,
    SessionExpired,
    BadRequest,
    UpstreamAiFailure,
    InvalidAiOutput,
    PersistenceFailure,
    InternalError,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::BadRequest => "BAD_REQUEST",
            Self::UpstreamAiFailure => "UPSTREAM_AI_FAILURE",
            Self::InvalidAiOutput => "INVALID_AI_OUTPUT",
            Self::PersistenceFailure => "PERSISTENCE_FAILURE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Unknown codes decode to `InternalError`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "UNAUTHENTICATED" => Self::Unauthenticated,
            "SESSION_EXPIRED" => Self::SessionExpired,
            "BAD_REQUEST" => Self::BadRequest,
            "UPSTREAM_AI_FAILURE" => Self::UpstreamAiFailure,
            "INVALID_AI_OUTPUT" => Self::InvalidAiOutput,
            "PERSISTENCE_FAILURE" => Self::PersistenceFailure,
            _ => Self::InternalError,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Unauthenticated | Self::SessionExpired => Status::Unauthorized,
            Self::BadRequest => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            Self::Unauthenticated => &["Log in and retry the request"],
            Self::SessionExpired => &["Your session has expired, log in again"],
            Self::BadRequest => &[
                "Check your request format",
                "Verify all required fields are present",
            ],
            Self::UpstreamAiFailure | Self::InvalidAiOutput => &[
                "The AI service could not produce a usable answer",
                "Try again in a few moments",
            ],
            Self::PersistenceFailure | Self::InternalError => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required. Please log in.")]
    Unauthenticated,

    #[error("Authentication session has expired. Please log in again.")]
    SessionExpired,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("AI service failure: {0}")]
    UpstreamAiFailure(String),

    #[error("AI model returned an object with an invalid shape ({} violation(s))", .0.len())]
    InvalidAiOutput(Vec<Violation>),

    #[error("Failed to save result: {0}")]
    PersistenceFailure(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::UpstreamAiFailure(_) => ErrorKind::UpstreamAiFailure,
            Self::InvalidAiOutput(_) => ErrorKind::InvalidAiOutput,
            Self::PersistenceFailure(_) => ErrorKind::PersistenceFailure,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Message exposed to the caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_body(&self) -> StandardErrorResponse {
        let kind = self.kind();
        StandardErrorResponse::new(
            self.public_message(),
            kind.code().to_string(),
            kind.suggestions(),
        )
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let kind = self.kind();
        match &self {
            ApiError::InvalidAiOutput(violations) => {
                for violation in violations {
                    error!("AI output violation at {}: {}", violation.path, violation.message);
                }
            }
            ApiError::Internal(e) => error!("Internal error on {}: {:?}", req.uri(), e),
            other if kind.status() == Status::InternalServerError => {
                error!("Request {} failed: {}", req.uri(), other)
            }
            _ => {}
        }

        (kind.status(), Json(self.to_body())).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip_through_from_code() {
        for kind in [
            ErrorKind::Unauthenticated,
            ErrorKind::SessionExpired,
            ErrorKind::BadRequest,
            ErrorKind::UpstreamAiFailure,
            ErrorKind::InvalidAiOutput,
            ErrorKind::PersistenceFailure,
            ErrorKind::InternalError,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
        }
        assert_eq!(ErrorKind::from_code("SOMETHING_ELSE"), ErrorKind::InternalError);
    }

    #[test]
    fn test_serde_name_matches_code() {
        let json = serde_json::to_string(&ErrorKind::InvalidAiOutput).unwrap();
        assert_eq!(json, "\"INVALID_AI_OUTPUT\"");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthenticated.kind().status(), Status::Unauthorized);
        assert_eq!(ApiError::SessionExpired.kind().status(), Status::Unauthorized);
        assert_eq!(
            ApiError::bad_request("missing").kind().status(),
            Status::BadRequest
        );
        assert_eq!(
            ApiError::InvalidAiOutput(vec![]).kind().status(),
            Status::InternalServerError
        );
        assert_eq!(
            ApiError::PersistenceFailure("disk".into()).kind().status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_internal_message_is_not_leaked() {
        let err = ApiError::Internal(anyhow::anyhow!("db password is hunter2"));
        assert_eq!(err.public_message(), "An unexpected error occurred.");
        assert_eq!(err.to_body().error_code, "INTERNAL_ERROR");
    }
}
