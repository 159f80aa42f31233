use super::{truncate_prompt, SqlModel, MAX_PROMPT_CHARS};
use crate::model::GenerationParams;
use async_trait::async_trait;
use serde_json::json;

/// Completion client for an HTTP inference server hosting the SQL model.
pub struct HttpModelClient {
    pub endpoint: String,
    pub model: String,
    client: reqwest::Client,
}

impl HttpModelClient {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            endpoint,
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SqlModel for HttpModelClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> anyhow::Result<String> {
        let prompt = truncate_prompt(prompt, MAX_PROMPT_CHARS);

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "max_new_tokens": params.max_new_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "use_cache": params.use_cache,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("completion API error: {}", error_text);
        }

        let json: serde_json::Value = resp.json().await?;

        // Accept both bare `{"text": ...}` servers and OpenAI-style
        // `{"choices": [{"text": ...}]}` responses.
        let text = json
            .pointer("/text")
            .and_then(|v| v.as_str())
            .or_else(|| json.pointer("/choices/0/text").and_then(|v| v.as_str()))
            .ok_or_else(|| anyhow::anyhow!("completion response missing text"))?
            .to_string();

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
