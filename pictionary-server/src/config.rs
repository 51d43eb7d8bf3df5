use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::arbitration::ArbitrationTiming;
use crate::recognition::RecognitionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    MustBePositive { key: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub words_file: Option<String>,
    pub round_duration_seconds: u32,
    pub tick_interval_ms: u64,
    pub debounce_ms: u64,
    pub recognition_min_interval_ms: u64,
    pub recognition_timeout_ms: u64,
    pub vision_api_url: String,
    pub vision_model: String,
    pub vision_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            words_file: non_empty_env("WORDS_FILE"),
            round_duration_seconds: parse_env(
                "ROUND_DURATION_SECONDS",
                defaults.round_duration_seconds,
            )?,
            tick_interval_ms: parse_env("TICK_INTERVAL_MS", defaults.tick_interval_ms)?,
            debounce_ms: parse_env("DEBOUNCE_MS", defaults.debounce_ms)?,
            recognition_min_interval_ms: parse_env(
                "RECOGNITION_MIN_INTERVAL_MS",
                defaults.recognition_min_interval_ms,
            )?,
            recognition_timeout_ms: parse_env(
                "RECOGNITION_TIMEOUT_MS",
                defaults.recognition_timeout_ms,
            )?,
            vision_api_url: env::var("VISION_API_URL").unwrap_or(defaults.vision_api_url),
            vision_model: env::var("VISION_MODEL").unwrap_or(defaults.vision_model),
            vision_api_key: non_empty_env("VISION_API_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.round_duration_seconds == 0 {
            return Err(ConfigError::MustBePositive {
                key: "ROUND_DURATION_SECONDS",
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::MustBePositive {
                key: "TICK_INTERVAL_MS",
            });
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::MustBePositive { key: "DEBOUNCE_MS" });
        }
        Ok(())
    }

    pub fn arbitration_timing(&self) -> ArbitrationTiming {
        ArbitrationTiming {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            debounce_window: Duration::from_millis(self.debounce_ms),
        }
    }

    pub fn recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            min_interval: Duration::from_millis(self.recognition_min_interval_ms),
            request_timeout: Duration::from_millis(self.recognition_timeout_ms),
            api_url: self.vision_api_url.clone(),
            model: self.vision_model.clone(),
            api_key: self.vision_api_key.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://air_pictionary.db?mode=rwc".to_string(),
            words_file: None,
            round_duration_seconds: 120,
            tick_interval_ms: 1000,
            debounce_ms: 2000,
            recognition_min_interval_ms: 1000,
            recognition_timeout_ms: 5000,
            vision_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            vision_model: "gpt-4-vision-preview".to_string(),
            vision_api_key: None,
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}
