//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use invx_core::models::config::LlmConfig;
use invx_core::{CallContext, ModelClient, ModelError};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(&'a str),
    Parts(Vec<Part<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking HTTP client for a chat-completions endpoint.
pub struct HttpModelClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl HttpModelClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("invx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Build a client from the API key in `config.api_key_env`, if set.
    pub fn from_env(config: &LlmConfig) -> anyhow::Result<Option<Self>> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(Self::new(config, key.trim())?)),
            _ => Ok(None),
        }
    }

    fn complete(&self, ctx: &CallContext, request: &ChatRequest<'_>) -> Result<String, ModelError> {
        if ctx.is_done() {
            return Err("call cancelled before the request was sent".into());
        }

        let timeout = ctx
            .remaining()
            .map_or(self.timeout, |remaining| remaining.min(self.timeout));
        debug!("POST {} model={} timeout={:?}", self.endpoint, request.model, timeout);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(request)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(format!("model API error {}: {}", status, body).into());
        }

        let body: ChatResponse = response.json()?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or("model API returned no choices")?;

        Ok(content.trim().to_string())
    }
}

impl ModelClient for HttpModelClient {
    fn chat_text(&self, ctx: &CallContext, model: &str, system: &str, user: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(system),
                },
                Message {
                    role: "user",
                    content: Content::Text(user),
                },
            ],
        };
        self.complete(ctx, &request)
    }

    fn chat_with_image(
        &self,
        ctx: &CallContext,
        model: &str,
        system: &str,
        user: &str,
        image: &[u8],
        mime: &str,
    ) -> Result<String, ModelError> {
        let request = ChatRequest {
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(system),
                },
                Message {
                    role: "user",
                    content: Content::Parts(vec![
                        Part::Text { text: user },
                        Part::ImageUrl {
                            image_url: ImageUrl { url: data_url(image, mime) },
                        },
                    ]),
                },
            ],
        };
        self.complete(ctx, &request)
    }
}

fn data_url(image: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(image))
}
