//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for hosts that speak the Ollama chat API.

use std::time::Duration;

use async_trait::async_trait;
use crm_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use ollama_rs::{
    Ollama,
    error::OllamaError,
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
        parameters::FormatType,
    },
    models::ModelOptions,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`
    pub base_url: String,

    /// Model used when the caller does not override it
    pub model: String,

    /// Bearer token for hosted gateways (optional)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// Split the base URL into the host and port `Ollama` expects
    fn endpoint(&self) -> Result<(reqwest::Url, u16)> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AgentError::Config(format!("LLM_BASE_URL is not a URL: {e}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AgentError::Config(format!("LLM_BASE_URL has no port: {url}")))?;
        Ok((url, port))
    }

    /// HTTP client carrying the timeout and, for hosted gateways, the bearer key
    fn http_client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| AgentError::Config("LLM_API_KEY is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))
    }
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let (url, port) = config.endpoint()?;
        let client = Ollama::new_with_client(url, port, config.http_client()?);

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Convert CRM messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> ChatMessageRequest {
        let model = if options.model.is_empty() { &self.config.model } else { &options.model };

        let request = ChatMessageRequest::new(model.clone(), Self::convert_messages(messages))
            .options(Self::build_options(options));

        if options.json_output {
            request.format(FormatType::Json)
        } else {
            request
        }
    }

    fn convert_completion(response: ChatMessageResponse) -> Completion {
        let usage = response
            .final_data
            .as_ref()
            .map(|d| token_usage(d.prompt_eval_count, d.eval_count));

        Completion {
            content: response.message.content,
            model: response.model,
            usage,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Provider-reported counts, saturating rather than wrapping
fn token_usage(prompt_eval_count: u64, eval_count: u64) -> TokenUsage {
    let prompt_tokens = u32::try_from(prompt_eval_count).unwrap_or(u32::MAX);
    let completion_tokens = u32::try_from(eval_count).unwrap_or(u32::MAX);
    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens.saturating_add(completion_tokens),
    }
}

fn map_error(err: OllamaError) -> AgentError {
    match err {
        OllamaError::ReqwestError(e) if e.is_timeout() || e.is_connect() => {
            AgentError::ProviderUnavailable(e.to_string())
        }
        OllamaError::ReqwestError(e) => match e.status().map(|s| s.as_u16()) {
            Some(401 | 403) => AgentError::Auth(e.to_string()),
            Some(429) => AgentError::RateLimited(e.to_string()),
            Some(500..=599) => AgentError::ProviderUnavailable(e.to_string()),
            _ => AgentError::Provider(e.to_string()),
        },
        OllamaError::JsonError(e) => AgentError::Provider(format!("invalid response body: {e}")),
        other => AgentError::Provider(other.to_string()),
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = self.build_request(messages, options);

        let response = self.client.send_chat_messages(request).await.map_err(map_error)?;

        Ok(Self::convert_completion(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_endpoint_split() {
        let config = OllamaConfig { base_url: "https://llm.example.com".into(), ..Default::default() };
        let (url, port) = config.endpoint().unwrap();
        assert_eq!(url.host_str(), Some("llm.example.com"));
        assert_eq!(port, 443);

        let (_, port) = OllamaConfig::default().endpoint().unwrap();
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_bad_base_url_is_config_error() {
        let config = OllamaConfig { base_url: "not a url".into(), ..Default::default() };
        assert!(matches!(OllamaProvider::from_config(config), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_api_key_builds_client() {
        let config = OllamaConfig { api_key: Some("secret".into()), ..Default::default() };
        let provider = OllamaProvider::from_config(config).unwrap();
        assert_eq!(provider.config().api_key.as_deref(), Some("secret"));

        let config = OllamaConfig { api_key: Some("bad\nkey".into()), ..Default::default() };
        assert!(matches!(OllamaProvider::from_config(config), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![Message::system("You are helpful."), Message::user("Hello")];

        let converted = OllamaProvider::convert_messages(&messages);
        assert_eq!(converted.len(), 2);
        assert!(matches!(converted[0].role, MessageRole::System));
        assert_eq!(converted[1].content, "Hello");
    }

    #[test]
    fn test_options_mapping() {
        let options = GenerationOptions { max_tokens: 256, ..Default::default() };
        let value = serde_json::to_value(OllamaProvider::build_options(&options)).unwrap();
        assert_eq!(value["num_predict"], 256);

        let huge = GenerationOptions { max_tokens: u32::MAX, ..Default::default() };
        let value = serde_json::to_value(OllamaProvider::build_options(&huge)).unwrap();
        assert_eq!(value["num_predict"], i32::MAX);
    }

    #[test]
    fn test_token_usage() {
        assert_eq!(token_usage(12, 30).total_tokens, 42);

        let usage = token_usage(u64::MAX, 5);
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, u32::MAX);

        let usage = token_usage(u64::from(u32::MAX) - 1, 10);
        assert_eq!(usage.total_tokens, u32::MAX);
    }
}
