//! HTTP-backed text generator

use super::{ExplanationPayload, TextGenerator};
use crate::config::ExplanationConfig;
use crate::error::{ExoError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    payload: &'a ExplanationPayload,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// POSTs `{prompt, payload}` to an endpoint and reads back `{text}`
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ExoError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// `None` when no endpoint is configured
    pub fn from_config(config: &ExplanationConfig) -> Result<Option<Self>> {
        match &config.endpoint {
            Some(endpoint) => Ok(Some(Self::new(
                endpoint.clone(),
                config.api_key.clone(),
                config.timeout_secs,
            )?)),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str, payload: &ExplanationPayload) -> Result<String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt, payload });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExoError::ExplanationError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExoError::ExplanationError(format!(
                "generator returned HTTP {}",
                status
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExoError::ExplanationError(format!("invalid generator response: {}", e)))?;
        Ok(body.text)
    }
}
