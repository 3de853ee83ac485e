use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::core::errors::{AppError, AppResult};

use super::LanguageModel;

const PREDICTIONS_ENDPOINT: &str = "https://api.replicate.com/v1/predictions";

#[derive(Debug, Clone)]
pub struct ReplicateClient {
    http: reqwest::Client,
    model_version: String,
    api_token: String,
}

impl ReplicateClient {
    pub fn new(model: impl Into<String>, api_token: impl Into<String>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        // Model references come as "owner/name:version"; the API wants the version hash.
        let model = model.into();
        let model_version = model
            .rsplit_once(':')
            .map_or(model.clone(), |(_, version)| version.to_string());
        Ok(Self {
            http,
            model_version,
            api_token: api_token.into(),
        })
    }
}

#[async_trait]
impl LanguageModel for ReplicateClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let payload = serde_json::json!({
            "version": self.model_version,
            "input": {
                "prompt": prompt,
                "temperature": 0.1,
                "max_length": 2000,
                "top_p": 0.9
            }
        });

        let response = self
            .http
            .post(PREDICTIONS_ENDPOINT)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AppError::ProviderAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(AppError::ProviderRateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ProviderInvalidResponse(format!(
                    "status {status} body {body}"
                )));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::ProviderInvalidResponse(err.to_string()))?;

        if body.get("status").and_then(Value::as_str) == Some("failed") {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("prediction failed");
            return Err(AppError::ProviderInvalidResponse(message.to_string()));
        }

        let output = body
            .get("output")
            .ok_or_else(|| AppError::ProviderInvalidResponse("missing prediction output".to_string()))?;
        Ok(join_output(output))
    }
}

/// Language models stream their output as an array of string chunks; some
/// older models return a single string instead.
fn join_output(output: &Value) -> String {
    match output {
        Value::Array(chunks) => chunks.iter().filter_map(Value::as_str).collect(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
