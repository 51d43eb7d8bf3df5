use std::time::Duration;

use async_trait::async_trait;
use pictionary_core::guess_matcher;
use pictionary_types::{DrawingSnapshot, Recognition};
use tokio::sync::Mutex;

use crate::rate_limiter::RateLimiter;

pub mod mock;
pub mod vision;

pub use mock::MockGuesser;
pub use vision::{RecognitionError, VisionBackend};

/// Anything that can turn a drawing snapshot into ranked guesses.
///
/// Implementations never fail: problems are absorbed into an empty or
/// fallback result.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, snapshot: &DrawingSnapshot, target: &str) -> Recognition;
}

#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    pub min_interval: Duration,
    pub request_timeout: Duration,
    pub api_url: String,
    pub model: String,
    /// Without a key every call goes to the mock
    pub api_key: Option<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(5000),
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4-vision-preview".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug)]
struct ClientState {
    rate_limiter: RateLimiter,
    mock: MockGuesser,
}

/// Rate-limited recognizer with a remote vision backend and a mock
/// fallback. Created once per server; the limiter and mock counter live
/// as long as the client and are cleared only through [`reset`].
///
/// [`reset`]: RecognitionClient::reset
pub struct RecognitionClient {
    vision: Option<VisionBackend>,
    state: Mutex<ClientState>,
}

impl RecognitionClient {
    pub fn new(config: RecognitionConfig) -> Self {
        Self::with_mock(config, MockGuesser::new())
    }

    pub fn with_mock(config: RecognitionConfig, mock: MockGuesser) -> Self {
        let vision = config.api_key.map(|api_key| {
            VisionBackend::new(config.api_url, config.model, api_key, config.request_timeout)
        });

        if vision.is_none() {
            tracing::warn!("No vision API key provided, using mock recognition");
        }

        Self {
            vision,
            state: Mutex::new(ClientState {
                rate_limiter: RateLimiter::min_interval(config.min_interval),
                mock,
            }),
        }
    }

    pub fn is_mock_only(&self) -> bool {
        self.vision.is_none()
    }

    /// Clear the rate limiter and the mock attempt counter
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.rate_limiter.reset();
        state.mock.reset();
    }

    pub async fn mock_attempts(&self) -> u32 {
        self.state.lock().await.mock.attempts()
    }

    async fn mock_guesses(&self, target: &str) -> Vec<String> {
        self.state.lock().await.mock.generate(target)
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    async fn recognize(&self, snapshot: &DrawingSnapshot, target: &str) -> Recognition {
        {
            let mut state = self.state.lock().await;
            if !state.rate_limiter.check_rate_limit().await {
                tracing::debug!("Recognition request throttled");
                return Recognition::empty();
            }
        }

        let guesses = match &self.vision {
            None => self.mock_guesses(target).await,
            Some(vision) => match vision.request_guesses(snapshot).await {
                Ok(guesses) => guesses,
                Err(e) => {
                    tracing::warn!("Vision recognition failed, using mock guesses: {}", e);
                    self.mock_guesses(target).await
                }
            },
        };

        guess_matcher::evaluate(guesses, target)
    }
}
