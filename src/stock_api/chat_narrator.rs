use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};
use std::future::Future;
use tracing::debug;

use super::http_client::http_client;
use super::narrative::{NarrativePrompt, NarrativeProvider};

const SYSTEM_PROMPT: &str =
    "You are a professional stock market analyst. Give a concise, data-driven analysis in plain prose.";

/// Narrative provider backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatNarrator {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
}

impl ChatNarrator {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
            model: model.into(),
            temperature: 0.7,
        }
    }

    pub fn request_body(&self, prompt: &NarrativePrompt) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt.render()}
            ],
            "temperature": self.temperature
        })
    }

    async fn send(&self, body: Value) -> anyhow::Result<String> {
        let client = http_client().await?;
        let mut request = client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.context("narrative request failed")?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("narrative API error: {} - {}", status, error_text);
        }

        let json: Value = response.json().await.context("narrative response is not JSON")?;
        debug!(model = %self.model, "narrative response received");
        extract_content(&json)
    }
}

pub fn extract_content(json: &Value) -> anyhow::Result<String> {
    if let Some(error) = json.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown error");
        bail!("narrative API error: {}", message);
    }
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("no content in narrative response"))
}

impl NarrativeProvider for ChatNarrator {
    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &NarrativePrompt) -> impl Future<Output = anyhow::Result<String>> + Send {
        let body = self.request_body(prompt);
        self.send(body)
    }
}
