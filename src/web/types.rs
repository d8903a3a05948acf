// src/web/types.rs

use crate::ai::{GenerativeModel, LanguageAnalyzer};
use crate::auth::TokenVerifier;
use crate::database::DocumentStore;
use crate::types::ChatMessage;
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collaborators shared by every request handler.
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub model: Arc<dyn GenerativeModel>,
    pub language: Arc<dyn LanguageAnalyzer>,
    pub store: Arc<dyn DocumentStore>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_mb: u64,
}

#[derive(FromForm)]
pub struct ResumeUploadForm<'f> {
    #[field(name = "resumeFile")]
    pub resume_file: Option<TempFile<'f>>,
    #[field(name = "jobDescriptionText")]
    pub job_description_text: Option<String>,
}

// Request bodies keep required fields optional so a missing field is reported
// as BAD_REQUEST by the handler instead of a bare 422 from the JSON guard.

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CareerPathsRequest {
    pub strengths: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct RoadmapRequest {
    pub career_title: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub gaps: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ChatData {
    pub interview_context: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ChatRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub data: Option<ChatData>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalyzeAnswerRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub messages: Option<Vec<ChatMessage>>,
    pub interview_context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ProfileRequest {
    pub name: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AuthResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Error,
}

impl TextResponse {
    pub fn success(message: String) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }
}

/// Required non-blank string field.
pub fn required_text(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(required_text(Some(&"  Data Engineer ".to_string())), Some("Data Engineer"));
        assert_eq!(required_text(Some(&"   ".to_string())), None);
        assert_eq!(required_text(None), None);
    }

    #[test]
    fn test_roadmap_request_uses_camel_case() {
        let request: RoadmapRequest = rocket::serde::json::from_str(
            r#"{"careerTitle":"Data Engineer","strengths":["SQL"],"gaps":[]}"#,
        )
        .unwrap();
        assert_eq!(request.career_title.as_deref(), Some("Data Engineer"));
        assert_eq!(request.gaps, Some(vec![]));
    }

    #[test]
    fn test_error_body_shape() {
        let body = StandardErrorResponse::new(
            "Bad Request: missing".into(),
            "BAD_REQUEST".into(),
            vec![],
        );
        let value = rocket::serde::json::to_value(&body).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["success"], false);
        assert_eq!(value["error_code"], "BAD_REQUEST");
        assert_eq!(value.as_object().unwrap().len(), 5);
    }
}
