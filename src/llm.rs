//! OpenRouter chat-completions client.

use std::env;

use serde_json::json;

use crate::settings::Settings;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl LlmClient {
    /// Settings values win; empty fields fall back to OPENROUTER_API_KEY /
    /// LLM_MODEL from the environment.
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        let api_key = if settings.api_key.is_empty() {
            env::var("OPENROUTER_API_KEY").unwrap_or_default()
        } else {
            settings.api_key.clone()
        };
        if api_key.is_empty() {
            return Err("OPENROUTER_API_KEY not set".into());
        }

        let model = if settings.model.is_empty() {
            env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into())
        } else {
            settings.model.clone()
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One blocking-from-the-session's-view completion: system + user in,
    /// assistant text out. No timeout or retry.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature
        });

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://askdb.local")
            .header("X-Title", "askdb")
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("LLM request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(200).collect();
            return Err(format!("LLM HTTP {}: {}", status, truncated));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("LLM JSON parse error: {}", e))?;

        let text = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err("LLM returned an empty reply".into());
        }

        Ok(text)
    }
}
