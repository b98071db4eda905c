use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::AiConfig;
use crate::errors::GenerationError;

/// External text-generation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Chat-completions client for OpenRouter (or any OpenAI-compatible endpoint).
#[derive(Clone)]
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    config: AiConfig,
}

impl OpenRouterGenerator {
    pub fn new(config: AiConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model_name,
            "messages": [
                {"role": "system", "content": self.config.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn extract_content(response: &Value) -> Result<String, GenerationError> {
    if let Some(message) = response
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
    {
        return Err(GenerationError::Malformed(message.to_string()));
    }

    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or(GenerationError::EmptyResponse)
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<Value>().await?;
        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn extracts_first_choice_content() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "  Spend less on coffee.  "}}]
        });
        assert_eq!(extract_content(&body).unwrap(), "Spend less on coffee.");
    }

    #[test]
    fn missing_or_blank_content_is_an_empty_response() {
        for body in [
            json!({}),
            json!({"choices": []}),
            json!({"choices": [{"message": null}]}),
            json!({"choices": [{"message": {"content": "   "}}]}),
        ] {
            assert!(matches!(
                extract_content(&body),
                Err(GenerationError::EmptyResponse)
            ));
        }
    }

    #[test]
    fn provider_error_payload_is_malformed() {
        let body = json!({"error": {"message": "Rate limit exceeded", "code": 429}});
        match extract_content(&body) {
            Err(GenerationError::Malformed(message)) => assert_eq!(message, "Rate limit exceeded"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn request_body_carries_system_prompt_and_token_cap() {
        let generator = OpenRouterGenerator::new(Config::default().ai).unwrap();
        let body = generator.request_body("hello");
        assert_eq!(body["max_tokens"], 600);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let generator = OpenRouterGenerator::new(Config::default().ai).unwrap();
        let result = generator.generate("hello").await;
        assert!(matches!(result, Err(GenerationError::MissingApiKey)));
    }
}
