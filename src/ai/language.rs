// src/ai/language.rs
//! Sentiment and entity analysis of interview answers.

use super::AiError;
use crate::types::{AnswerAnalysis, Sentiment};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_LANGUAGE_API_URL: &str = "https://language.googleapis.com";
const MAX_KEYWORDS: usize = 5;
const KEYWORD_ENTITY_TYPES: [&str; 3] = ["ORGANIZATION", "OTHER", "WORK_OF_ART"];

#[rocket::async_trait]
pub trait LanguageAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnswerAnalysis, AiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    doc_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentResponse {
    document_sentiment: Option<DocumentSentiment>,
}

#[derive(Debug, Deserialize)]
struct DocumentSentiment {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    magnitude: f64,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Client for the Cloud Natural Language REST API.
pub struct GoogleLanguageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleLanguageClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<R: serde::de::DeserializeOwned>(&self, method: &str, text: &str) -> Result<R, AiError> {
        let url = format!("{}/v1/documents:{}", self.base_url, method);
        let request = DocumentRequest {
            document: Document {
                doc_type: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Natural Language API {} error {}: {}", method, status, message);
            return Err(AiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AiError::MalformedEnvelope(e.to_string()))
    }
}

#[rocket::async_trait]
impl LanguageAnalyzer for GoogleLanguageClient {
    async fn analyze(&self, text: &str) -> Result<AnswerAnalysis, AiError> {
        info!("Analyzing answer of {} chars", text.chars().count());

        let (sentiment, entities) = tokio::try_join!(
            self.call::<SentimentResponse>("analyzeSentiment", text),
            self.call::<EntitiesResponse>("analyzeEntities", text),
        )?;

        let sentiment = sentiment
            .document_sentiment
            .map(|s| Sentiment {
                score: round2(s.score),
                magnitude: round2(s.magnitude),
            })
            .unwrap_or(Sentiment {
                score: 0.0,
                magnitude: 0.0,
            });

        Ok(AnswerAnalysis {
            sentiment,
            keywords: extract_keywords(&entities.entities),
        })
    }
}

/// Names of skill-like entities, in provider order, capped at five.
pub fn extract_keywords(entities: &[Entity]) -> Vec<String> {
    entities
        .iter()
        .filter(|e| KEYWORD_ENTITY_TYPES.contains(&e.entity_type.as_str()))
        .map(|e| e.name.clone())
        .take(MAX_KEYWORDS)
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
