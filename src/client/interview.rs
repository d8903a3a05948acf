// src/client/interview.rs
use super::{ApiClient, ClientError};
use crate::error::ErrorKind;
use crate::types::{AnswerAnalysis, ChatMessage, ChatRole, FeedbackReport};
use futures::StreamExt;
use serde_json::json;
use tracing::{info, warn};

/// A mock interview held in memory for its lifetime.
pub struct InterviewSession {
    client: ApiClient,
    interview_context: String,
    messages: Vec<ChatMessage>,
}

impl InterviewSession {
    pub fn new(client: ApiClient, interview_context: impl Into<String>) -> Self {
        Self {
            client,
            interview_context: interview_context.into(),
            messages: Vec::new(),
        }
    }

    pub fn interview_context(&self) -> &str {
        &self.interview_context
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send a message and stream the interviewer's reply.
    ///
    /// `on_fragment` sees each piece as it arrives. The reply accumulates in a
    /// single assistant message which is returned once the stream closes. On
    /// failure the user message stays in the transcript and any partial reply
    /// is kept. An empty reply is an error and leaves no assistant message.
    pub async fn send<F>(&mut self, text: &str, mut on_fragment: F) -> Result<String, ClientError>
    where
        F: FnMut(&str),
    {
        self.messages.push(ChatMessage::user(text));

        let body = json!({
            "messages": self.messages,
            "data": { "interviewContext": self.interview_context },
        });
        let mut fragments = self.client.post_stream("/api/interview/chat", &body).await?;

        self.messages.push(ChatMessage::assistant(""));
        while let Some(fragment) = fragments.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    warn!("Interview reply interrupted: {}", e);
                    return Err(e);
                }
            };
            on_fragment(&fragment);
            if let Some(reply) = self.messages.last_mut() {
                reply.content.push_str(&fragment);
            }
        }

        let reply = self
            .messages
            .last()
            .filter(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if reply.is_empty() {
            self.messages.pop();
            warn!("Interview reply was empty");
            return Err(ClientError::new(
                ErrorKind::UpstreamAiFailure,
                "The interviewer did not reply. Please try again.",
            ));
        }
        info!("Interview reply received ({} chars)", reply.chars().count());
        Ok(reply)
    }

    pub async fn analyze_answer(&self, text: &str) -> Result<AnswerAnalysis, ClientError> {
        self.client
            .post_json("/api/interview/analyze-answer", &json!({ "text": text }))
            .await
    }

    /// Score the whole transcript.
    pub async fn feedback(&self) -> Result<FeedbackReport, ClientError> {
        self.client
            .post_json(
                "/api/interview/feedback",
                &json!({
                    "messages": self.messages,
                    "interviewContext": self.interview_context,
                }),
            )
            .await
    }
}
