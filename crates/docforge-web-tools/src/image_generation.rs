//! Stability image-generation client
//!
//! One call: text prompt in, base64 PNG out. The caller decides where the
//! bytes land.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use crate::{USER_AGENT, WebToolError};

const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
const ENGINE: &str = "stable-diffusion-v1-6";

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub finish_reason: Option<String>,
}

pub struct StabilityClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    artifacts: Vec<GenerationArtifact>,
}

#[derive(Debug, Deserialize)]
struct GenerationArtifact {
    base64: String,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

impl StabilityClient {
    pub fn new(timeout: Duration) -> Result<Self, WebToolError> {
        Self::with_base_url(timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(timeout: Duration, base_url: &str) -> Result<Self, WebToolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| WebToolError::Http(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> Result<GeneratedImage, WebToolError> {
        if api_key.is_empty() {
            return Err(WebToolError::InvalidInput(
                "Missing Stability AI API Key".to_string(),
            ));
        }

        let url = format!(
            "{}/v1/generation/{ENGINE}/text-to-image",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&json!({
                "text_prompts": [{ "text": prompt }],
                "cfg_scale": 7,
                "samples": 1,
                "steps": 30,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(WebToolError::Http(format!(
                "Stability AI Error ({status}): {detail}"
            )));
        }

        let payload: GenerationResponse = response
            .json()
            .await
            .map_err(|error| WebToolError::Payload(error.to_string()))?;

        let artifact = payload
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| WebToolError::Payload("response carried no artifacts".to_string()))?;

        let bytes = BASE64
            .decode(artifact.base64.as_bytes())
            .map_err(|error| WebToolError::Payload(format!("invalid image payload: {error}")))?;

        Ok(GeneratedImage {
            bytes,
            finish_reason: artifact.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = StabilityClient::new(Duration::from_secs(1)).unwrap();
        let result = client.generate("", "a lighthouse").await;
        assert!(matches!(result, Err(WebToolError::InvalidInput(_))));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            StabilityClient::with_base_url(Duration::from_secs(1), "http://localhost:9999/")
                .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
