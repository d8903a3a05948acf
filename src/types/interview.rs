// src/types/interview.rs
use crate::schema::{Shape, Validated};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    pub overall_score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

impl Validated for FeedbackReport {
    fn shape() -> Shape {
        Shape::object([
            ("overallScore", Shape::integer().between(0, 100)),
            ("summary", Shape::string()),
            ("strengths", Shape::array(Shape::string()).at_least(2)),
            ("areasForImprovement", Shape::array(Shape::string()).at_least(2)),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerAnalysis {
    pub sentiment: Sentiment,
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    #[test]
    fn test_chat_message_wire_format() {
        let msg: ChatMessage = serde_json::from_value(json!({"role": "user", "content": "Hi"})).unwrap();
        assert_eq!(msg, ChatMessage::user("Hi"));
        assert_eq!(
            serde_json::to_value(ChatMessage::assistant("Hello")).unwrap(),
            json!({"role": "assistant", "content": "Hello"})
        );
        assert!(serde_json::from_value::<ChatMessage>(json!({"role": "system", "content": "x"})).is_err());
    }

    #[test]
    fn test_feedback_needs_two_items_each() {
        let value = json!({
            "overallScore": 72,
            "summary": "Clear answers, light on detail.",
            "strengths": ["Structured answers"],
            "areasForImprovement": ["Use STAR", "Give metrics"]
        });
        let err = validate::<FeedbackReport>(&value).unwrap_err();
        assert_eq!(err[0].path, "/strengths");

        let mut fixed = value.clone();
        fixed["strengths"] = json!(["Structured answers", "Calm delivery"]);
        let report: FeedbackReport = validate(&fixed).unwrap();
        assert_eq!(report.overall_score, 72);
    }
}
