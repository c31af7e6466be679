use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model name '{0}' isn't valid. Please use /models to select a model again.")]
    InvalidModel(String),
    #[error("provider '{0}' is not configured")]
    UnknownProvider(String),
    #[error("no API key for provider '{provider}', set one with /config or {env_var}")]
    ApiKeyMissing { provider: String, env_var: String },
    #[error("API request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiKind {
    Anthropic,
    OpenAi,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for one `provider/model` pair from the config.
pub struct LlmClient {
    client: Client,
    kind: ApiKind,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &Config, selected: &str) -> Result<Self, LlmError> {
        dotenv::dotenv().ok();

        let (provider_name, model) = selected
            .split_once('/')
            .filter(|(p, m)| !p.is_empty() && !m.is_empty())
            .ok_or_else(|| LlmError::InvalidModel(selected.to_string()))?;

        let provider = config
            .providers
            .get(provider_name)
            .ok_or_else(|| LlmError::UnknownProvider(provider_name.to_string()))?;

        let env_var = format!("{}_API_KEY", provider_name.to_uppercase().replace('-', "_"));
        let api_key = if provider.api_key.is_empty() {
            env::var(&env_var).map_err(|_| LlmError::ApiKeyMissing {
                provider: provider_name.to_string(),
                env_var: env_var.clone(),
            })?
        } else {
            provider.api_key.clone()
        };

        let kind = if provider_name == "anthropic" {
            ApiKind::Anthropic
        } else {
            ApiKind::OpenAi
        };

        Ok(LlmClient {
            client: Client::new(),
            kind,
            base_url: provider.url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(
        &self,
        system_prompt: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        info!(model = %self.model, temperature, "requesting completion");

        let completion = match self.kind {
            ApiKind::Anthropic => self.complete_anthropic(system_prompt, prompt, temperature).await?,
            ApiKind::OpenAi => self.complete_openai(system_prompt, prompt, temperature).await?,
        };

        Ok(strip_think(&completion))
    }

    async fn complete_anthropic(
        &self,
        system_prompt: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let url = format!("{}/messages", self.base_url);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let body = read_body(response).await?;
        parse_anthropic(&body)
    }

    async fn complete_openai(
        &self,
        system_prompt: &str,
        prompt: &str,
        temperature: f64,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let body = read_body(response).await?;
        parse_chat(&body)
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, LlmError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(LlmError::RequestFailed {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn parse_anthropic(body: &str) -> Result<String, LlmError> {
    let response: AnthropicResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ParseError(e.to_string()))?;

    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(LlmError::ParseError("No text in response".to_string()));
    }
    Ok(text)
}

fn parse_chat(body: &str) -> Result<String, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ParseError(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| LlmError::ParseError("no completion choices returned".to_string()))
}

/// Removes a reasoning model's `<think>...</think>` preamble.
pub fn strip_think(completion: &str) -> String {
    let Ok(re) = Regex::new(r"(?s)<think>.*?</think>") else {
        return completion.to_string();
    };
    match re.find(completion) {
        Some(m) => format!(
            "{}{}",
            &completion[..m.start()],
            completion[m.end()..].trim()
        ),
        None => completion.to_string(),
    }
}
