use thiserror::Error;

use crate::config::prompt::PromptError;
use crate::llm::LlmError;

/// Failures surfaced to the caller as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid JSON input")]
    InvalidJson,

    #[error("{0}")]
    Validation(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl HandlerError {
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        HandlerError::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(_: serde_json::Error) -> Self {
        HandlerError::InvalidJson
    }
}

impl From<rusqlite::Error> for HandlerError {
    fn from(err: rusqlite::Error) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<tokio::task::JoinError> for HandlerError {
    fn from(err: tokio::task::JoinError) -> Self {
        HandlerError::unexpected(err)
    }
}

impl From<LlmError> for HandlerError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidModelChoice(_) => HandlerError::Validation(err.to_string()),
            other => HandlerError::unexpected(other),
        }
    }
}

impl From<PromptError> for HandlerError {
    fn from(err: PromptError) -> Self {
        HandlerError::unexpected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_json_message() {
        assert_eq!(HandlerError::InvalidJson.to_string(), "Invalid JSON input");
    }

    #[test]
    fn validation_message_is_verbatim() {
        let e = HandlerError::Validation("missing field".into());
        assert_eq!(e.to_string(), "missing field");
    }

    #[test]
    fn unexpected_message_is_prefixed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: HandlerError = io_err.into();
        assert_eq!(e.to_string(), "An unexpected error occurred: file missing");
    }

    #[test]
    fn invalid_model_choice_is_a_validation_error() {
        let e: HandlerError = LlmError::InvalidModelChoice("gpt".into()).into();
        assert!(matches!(e, HandlerError::Validation(_)));
        assert!(e.to_string().contains("Invalid model choice"));
    }

    #[test]
    fn backend_failure_is_unexpected() {
        let e: HandlerError = LlmError::Backend("connection refused".into()).into();
        assert!(matches!(e, HandlerError::Unexpected(_)));
        assert!(e.to_string().ends_with("connection refused"));
    }
}
