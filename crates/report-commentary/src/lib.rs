#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/equity-report/equity-report/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Chart commentary via an OpenRouter-compatible endpoint.
//!
//! The request is image-in, short-text-out with a fixed system/user prompt
//! template: the model is asked for a ~120-word analyst paragraph about the
//! chart. Exactly one attempt is made per chart.
//!
//! # Example
//!
//! ```no_run
//! use report_commentary::OpenRouterProvider;
//! use report_core::CommentaryProvider;
//! use std::path::Path;
//!
//! # async fn example() -> report_core::Result<()> {
//! let provider = OpenRouterProvider::new("api-key");
//! let paragraph = provider.describe_chart(Path::new("charts/price.png")).await?;
//! println!("{paragraph}");
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::debug;

use report_core::error::{ReportError, Result};
use report_core::{CommentaryProvider, Provider};

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier.
const DEFAULT_MODEL: &str = "meta-llama/llama-4-maverick:free";

/// System prompt establishing the analyst persona.
const SYSTEM_PROMPT: &str = "You are a seasoned financial analyst with expertise in interpreting \
financial charts and metrics. Provide professional, insightful analysis focusing on key trends, \
potential implications, and actionable insights.";

/// User instruction bounding the output length and structure.
const USER_PROMPT: &str = "As a financial expert, please analyze this chart in approximately \
120 words, return as one plain paragraph, no formatting. Include:\n\
1. Key trends and patterns\n\
2. Important financial metrics and their implications\n\
3. Notable market insights\n\
4. Potential impact on investment decisions\n\
Keep the analysis concise, professional, and focused on the most significant aspects.";

/// Chart commentary provider for an OpenRouter-compatible API.
#[derive(Clone)]
pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenRouterProvider {
    /// Create a new provider with the given API key and default endpoint
    /// and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Overrides the API base URL (for compatible gateways).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builds the chat-completions payload for one base64-encoded PNG.
    fn chart_payload(&self, base64_image: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT,
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/png;base64,{base64_image}"),
                            },
                        },
                    ],
                },
            ],
        })
    }
}

impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn description(&self) -> &str {
        "Chart commentary from an OpenRouter-compatible multimodal endpoint"
    }
}

#[async_trait]
impl CommentaryProvider for OpenRouterProvider {
    async fn describe_chart(&self, image: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image).await?;
        let encoded = BASE64.encode(&bytes);
        debug!(image = %image.display(), bytes = bytes.len(), "Requesting chart commentary");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.chart_payload(&encoded))
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Network(format!("HTTP {status}: {body}")));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReportError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ReportError::Parse("completion had no choices".to_string()))
    }
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let provider = OpenRouterProvider::new("key");
        let payload = provider.chart_payload("QUJD");

        assert_eq!(payload["model"], DEFAULT_MODEL);
        assert_eq!(payload["messages"][0]["role"], "system");
        let image_url = payload["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(image_url, "data:image/png;base64,QUJD");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = OpenRouterProvider::new("secret_key_12345");
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_builder_overrides() {
        let provider = OpenRouterProvider::new("key")
            .with_base_url("http://localhost:9999/v1")
            .with_model("test-model");
        assert_eq!(provider.base_url, "http://localhost:9999/v1");
        assert_eq!(provider.chart_payload("x")["model"], "test-model");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"A paragraph."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "A paragraph.");
    }
}
