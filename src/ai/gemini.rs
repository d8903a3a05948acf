// src/ai/gemini.rs
use super::{AiError, ChatTurn, GenerativeModel, ResponseFormat, TextFragments, TurnRole};
use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    async fn send(&self, url: &str, body: &GenerateRequest<'_>) -> Result<reqwest::Response, AiError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        error!("Gemini API error {}: {}", status, message);
        Err(AiError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[rocket::async_trait]
impl GenerativeModel for GeminiClient {
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: TurnRole::User.as_str(),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: match format {
                ResponseFormat::Json => Some(GenerationConfig {
                    response_mime_type: "application/json",
                }),
                ResponseFormat::Text => None,
            },
        };

        info!("Calling Gemini model {} ({:?})", self.model, format);
        let response = self.send(&self.endpoint("generateContent"), &request).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::MalformedEnvelope(e.to_string()))?;

        match body.text() {
            Some(text) if !text.trim().is_empty() => {
                debug!("Gemini completion received: {} bytes", text.len());
                Ok(text)
            }
            _ => Err(AiError::EmptyCompletion),
        }
    }

    async fn stream_chat(&self, turns: Vec<ChatTurn>) -> Result<TextFragments, AiError> {
        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: turn.role.as_str(),
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
            generation_config: None,
        };

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        info!("Opening Gemini stream on model {} ({} turns)", self.model, turns.len());
        let response = self.send(&url, &request).await?;

        let fragments = response
            .bytes_stream()
            .map_err(AiError::from)
            .scan(SseDecoder::default(), |decoder, chunk| {
                let events: Vec<Result<String, AiError>> = match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .map(|data| decode_stream_event(&data))
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(futures::stream::iter(events)))
            })
            .flatten()
            .try_filter(|text| futures::future::ready(!text.is_empty()))
            .boxed();

        Ok(fragments)
    }
}

fn decode_stream_event(data: &str) -> Result<String, AiError> {
    let event: GenerateResponse =
        serde_json::from_str(data).map_err(|e| AiError::MalformedEnvelope(e.to_string()))?;
    Ok(event.text().unwrap_or_default())
}

/// Splits a server-sent-events byte stream into `data:` payloads.
///
/// Gemini emits one JSON object per `data:` line, so every complete data line
/// is an event. Partial lines (and split UTF-8 sequences) wait for the next chunk.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim_start();
                if !data.is_empty() {
                    events.push(data.to_string());
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let body: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(body.text().is_none());
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_sse_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let events = decoder.push(b"1}\r\n\r\ndata: {\"b\":2}\r\n");
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_sse_decoder_keeps_multibyte_characters_across_chunks() {
        let mut decoder = SseDecoder::default();
        let line = "data: ₹8,00,000\n".as_bytes();
        let (head, tail) = line.split_at(8); // splits the rupee sign
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["₹8,00,000"]);
    }

    #[test]
    fn test_sse_decoder_ignores_comments_and_other_fields() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\nevent: message\ndata: {}\n");
        assert_eq!(events, vec!["{}"]);
    }

    #[test]
    fn test_decode_stream_event() {
        let text = decode_stream_event(
            r#"{"candidates":[{"content":{"parts":[{"text":"Tell me about yourself."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(text, "Tell me about yourself.");
        assert_eq!(decode_stream_event(r#"{"candidates":[]}"#).unwrap(), "");
        assert!(decode_stream_event("not json").is_err());
    }
}
