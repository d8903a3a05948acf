// src/web/handlers/interview_handlers.rs
use crate::ai::{self, prompts, AiError};
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::types::{AnswerAnalysis, FeedbackReport};
use crate::web::types::*;
use futures::stream::{self, BoxStream, StreamExt};
use rocket::response::stream::TextStream;
use rocket::serde::json::Json;
use rocket::State;
use std::future::ready;
use tracing::{error, info};

pub type ChatStream = TextStream<BoxStream<'static, String>>;

/// Relays the interviewer's reply fragment by fragment.
///
/// A provider failure before the first text fragment is a regular JSON error;
/// once bytes have been sent, a failure is logged and the body simply ends.
pub async fn interview_chat_handler(
    request: Json<ChatRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<ChatStream, ApiError> {
    let request = request.into_inner();
    let interview_context = request
        .data
        .as_ref()
        .and_then(|data| required_text(data.interview_context.as_ref()))
        .map(str::to_string);

    let (messages, interview_context) = match (request.messages, interview_context) {
        (Some(messages), Some(context)) if !messages.is_empty() => (messages, context),
        _ => {
            return Err(ApiError::bad_request(
                "Messages and interview context are required.",
            ))
        }
    };

    info!(
        "Interview turn {} for {} ({})",
        messages.len(),
        auth.uid(),
        interview_context
    );

    let turns = prompts::interview_turns(&messages, &interview_context);
    let mut fragments = state.model.stream_chat(turns).await?;

    // Hold the response until there is text to send, so an upstream failure
    // still reaches the caller as a JSON error.
    let first = loop {
        match fragments.next().await {
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => break text,
            Some(Err(e)) => {
                error!("Interview stream for {} failed before any text: {}", auth.uid(), e);
                return Err(e.into());
            }
            None => {
                error!("Interview stream for {} produced no text", auth.uid());
                return Err(AiError::EmptyCompletion.into());
            }
        }
    };

    let uid = auth.uid().to_string();
    let body = stream::once(ready(Ok(first)))
        .chain(fragments)
        .take_while(move |fragment| {
            if let Err(e) = fragment {
                error!("Interview stream for {} ended early: {}", uid, e);
            }
            ready(fragment.is_ok())
        })
        .filter_map(|fragment: Result<String, AiError>| ready(fragment.ok()))
        .boxed();

    Ok(TextStream(body))
}

pub async fn analyze_answer_handler(
    request: Json<AnalyzeAnswerRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<AnswerAnalysis>, ApiError> {
    let text = required_text(request.text.as_ref())
        .ok_or_else(|| ApiError::bad_request("Answer text is required."))?;

    info!("Answer analysis requested by {}", auth.uid());
    let analysis = state.language.analyze(text).await?;
    Ok(Json(analysis))
}

pub async fn interview_feedback_handler(
    request: Json<FeedbackRequest>,
    auth: AuthenticatedUser,
    state: &State<AppState>,
) -> Result<Json<FeedbackReport>, ApiError> {
    let request = request.into_inner();
    let interview_context = required_text(request.interview_context.as_ref())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Transcript and interview context are required."))?;
    let messages = request
        .messages
        .ok_or_else(|| ApiError::bad_request("Transcript and interview context are required."))?;

    info!(
        "Interview feedback requested by {} ({} messages)",
        auth.uid(),
        messages.len()
    );

    let prompt = prompts::feedback_prompt(&interview_context, &messages);
    let report: FeedbackReport = ai::generate_validated(state.model.as_ref(), &prompt).await?;

    info!("Feedback for {}: score {}", auth.uid(), report.overall_score);
    Ok(Json(report))
}
