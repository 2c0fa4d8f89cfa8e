use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GenerationConfig;
use crate::services::conversation::manager::{GenerationError, TextGenerator};

/// Text generation over the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::MalformedPayload("no candidates".to_string()))?;

        let text = candidate
            .content
            .parts
            .into_iter()
            .next()
            .and_then(|part| part.text)
            .ok_or_else(|| GenerationError::MalformedPayload("candidate has no text part".to_string()))?;

        if text.trim().is_empty() {
            return Err(GenerationError::MalformedPayload("empty text".to_string()));
        }
        Ok(text)
    }
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout())
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Calling Gemini model {} ({} chars)", self.model, prompt.len());

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(e.to_string()))?;

        body.into_text()
    }
}
