use std::time::Duration;

use base64::Engine;
use pictionary_types::{DrawingSnapshot, GUESS_HISTORY_LIMIT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GUESS_PROMPT: &str = "This is a simple sketch drawing. What object or word could this represent? Provide exactly 3 guesses in order of confidence, separated by commas. Only provide the words, no explanations.";

const MAX_TOKENS: u32 = 50;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("snapshot has no rendered image")]
    MissingImage,
    #[error("snapshot image is not valid base64: {0}")]
    InvalidImage(#[from] base64::DecodeError),
    #[error("vision request timed out")]
    Timeout,
    #[error("vision request failed: {0}")]
    Transport(reqwest::Error),
    #[error("vision backend returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed vision response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for RecognitionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RecognitionError::Timeout
        } else {
            RecognitionError::Transport(error)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions style vision endpoint asked for three ranked guesses.
#[derive(Debug, Clone)]
pub struct VisionBackend {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl VisionBackend {
    pub fn new(api_url: String, model: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_url,
            model,
            api_key,
            timeout,
        }
    }

    pub fn build_request(&self, image_base64: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: GUESS_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{}", image_base64),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        }
    }

    /// Ask the backend for ranked guesses. The target word is not sent;
    /// matching happens locally.
    pub async fn request_guesses(
        &self,
        snapshot: &DrawingSnapshot,
    ) -> Result<Vec<String>, RecognitionError> {
        let image = snapshot
            .image_base64
            .as_deref()
            .filter(|image| !image.is_empty())
            .ok_or(RecognitionError::MissingImage)?;
        base64::engine::general_purpose::STANDARD.decode(image)?;

        tracing::debug!("Sending {} byte snapshot to {}", image.len(), self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&self.build_request(image))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RecognitionError::Status(response.status()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| RecognitionError::MalformedResponse("missing message content".to_string()))?;

        let guesses = parse_guesses(&content);
        if guesses.is_empty() {
            return Err(RecognitionError::MalformedResponse(format!(
                "no guesses in {:?}",
                content
            )));
        }

        Ok(guesses)
    }
}

/// Split on commas, trim, uppercase, drop empties, keep the first three
pub fn parse_guesses(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(|guess| guess.trim().to_uppercase())
        .filter(|guess| !guess.is_empty())
        .take(GUESS_HISTORY_LIMIT)
        .collect()
}
