// src/ai/mod.rs
//! Generative model access. All model calls go through [`GenerativeModel`].

pub mod gemini;
pub mod language;
pub mod prompts;

pub use gemini::GeminiClient;
pub use language::{GoogleLanguageClient, LanguageAnalyzer};

use crate::error::ApiError;
use crate::schema::{self, Validated};
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider unreachable: {0}")]
    Transport(String),

    #[error("AI provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("AI provider returned an empty completion")]
    EmptyCompletion,

    #[error("AI provider response could not be decoded: {0}")]
    MalformedEnvelope(String),

    #[error("AI completion is not valid JSON: {0}")]
    NotJson(String),
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Transport(e.to_string())
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        ApiError::UpstreamAiFailure(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Text fragments of a streamed completion, in arrival order.
pub type TextFragments = BoxStream<'static, Result<String, AiError>>;

#[rocket::async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Single-shot completion. Resolves once the whole answer is available.
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, AiError>;

    /// Streamed completion over a multi-turn conversation.
    async fn stream_chat(&self, turns: Vec<ChatTurn>) -> Result<TextFragments, AiError>;
}

/// Strip a surrounding markdown code fence, if any.
pub fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_json_completion(text: &str) -> Result<serde_json::Value, AiError> {
    serde_json::from_str(strip_json_fences(text)).map_err(|e| AiError::NotJson(e.to_string()))
}

/// Ask the model for JSON and validate it against `T`'s shape.
///
/// Provider and decoding failures become `UpstreamAiFailure`; a well-formed
/// answer with the wrong shape becomes `InvalidAiOutput`.
pub async fn generate_validated<T: Validated>(
    model: &dyn GenerativeModel,
    prompt: &str,
) -> Result<T, ApiError> {
    let text = model.complete(prompt, ResponseFormat::Json).await?;
    validate_completion::<T>(&text)
}

pub fn validate_completion<T: Validated>(text: &str) -> Result<T, ApiError> {
    let value = parse_json_completion(text)?;
    schema::validate::<T>(&value).map_err(ApiError::InvalidAiOutput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_json_completion_rejects_prose() {
        let err = parse_json_completion("Sure! Here is your analysis.").unwrap_err();
        assert!(matches!(err, AiError::NotJson(_)));
    }

    #[test]
    fn test_validate_completion_reports_shape_errors() {
        let text = r#"{"strengths":["a","b","c"],"gaps":["x","y","z"],"atsScore":150,"suggestions":["s1","s2"]}"#;
        let err = validate_completion::<crate::types::AnalysisResult>(text).unwrap_err();
        match err {
            ApiError::InvalidAiOutput(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].path, "/atsScore");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_ai_error_maps_to_upstream_failure() {
        let api: ApiError = AiError::Status {
            status: 429,
            message: "Resource has been exhausted".into(),
        }
        .into();
        assert_eq!(api.kind(), crate::error::ErrorKind::UpstreamAiFailure);
    }
}
