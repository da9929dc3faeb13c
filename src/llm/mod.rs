//! Generative-model client abstraction.
//!
//! [`LanguageModel`] is the seam the advisory and chat layers call through.
//! [`create_model`] builds the configured provider and fails before any
//! network traffic when the API key is missing.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ModelConfig, API_KEY_ENV};

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no model API key configured: set {API_KEY_ENV} or [model].api_key")]
    MissingApiKey,

    #[error("unsupported model provider: {0}")]
    UnsupportedProvider(String),

    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("could not decode model response: {0}")]
    Decode(String),
}

impl LlmError {
    /// Rate-limit or quota exhaustion, recognized by a `429` or `quota` in
    /// the rendered message.
    pub fn is_rate_limited(&self) -> bool {
        let message = self.to_string();
        message.contains("429") || message.to_lowercase().contains("quota")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One prior conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Ask the provider to constrain the reply to a JSON value.
    Json,
}

/// `{system instruction, prior turns, new prompt}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub history: Vec<Turn>,
    pub prompt: String,
    pub response_format: ResponseFormat,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Single completion; returns the reply text.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, LlmError>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

/// Build the configured model client. Checks the API key up front.
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "gemini" => {
            let api_key = config.api_key().ok_or(LlmError::MissingApiKey)?;
            let client = GeminiClient::new(api_key, &config.model).with_base_url(&config.base_url);
            tracing::debug!(model = %config.model, "model client ready");
            Ok(Arc::new(client))
        }
        other => Err(LlmError::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_config(api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            api_key: api_key.map(str::to_string),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let err = create_model(&gemini_config(None)).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey));

        let err = create_model(&gemini_config(Some("   "))).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn builds_gemini_client() {
        let model = create_model(&gemini_config(Some("k"))).unwrap();
        assert_eq!(model.name(), "gemini-2.5-flash");
    }

    #[test]
    fn rejects_unknown_provider() {
        let config = ModelConfig {
            provider: "llamafile".into(),
            ..gemini_config(Some("k"))
        };
        assert!(matches!(
            create_model(&config).err().unwrap(),
            LlmError::UnsupportedProvider(p) if p == "llamafile"
        ));
    }

    #[test]
    fn rate_limit_detection_matches_status_or_quota() {
        let limited = LlmError::Api {
            status: 429,
            message: "Resource has been exhausted".into(),
        };
        assert!(limited.is_rate_limited());

        let quota = LlmError::Api {
            status: 403,
            message: "Quota exceeded for metric".into(),
        };
        assert!(quota.is_rate_limited());

        let other = LlmError::Api {
            status: 500,
            message: "internal".into(),
        };
        assert!(!other.is_rate_limited());
        assert!(!LlmError::EmptyResponse.is_rate_limited());
    }
}
