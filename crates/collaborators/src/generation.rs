use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{CodeGenerator, GenerationError};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You write complete, runnable single-file Streamlit apps in Python. \
Reply with the Python source only, without explanations.";

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Result<Self, GenerationError> {
        if settings.api_key.trim().is_empty() {
            return Err(GenerationError::NotConfigured(
                "missing API key (generation.api_key or OPENAI_API_KEY)".into(),
            ));
        }
        let endpoint = completions_endpoint(&settings.base_url)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: settings.api_key,
            model: settings.model,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn completions_endpoint(base_url: &str) -> Result<Url, GenerationError> {
    let mut base = Url::parse(base_url.trim()).map_err(|e| {
        GenerationError::NotConfigured(format!("invalid base url '{base_url}': {e}"))
    })?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions").map_err(|e| {
        GenerationError::NotConfigured(format!("invalid base url '{base_url}': {e}"))
    })
}

#[async_trait]
impl CodeGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting code generation");
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!(status = status.as_u16(), "generation backend rejected request");
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        Ok(strip_code_fences(&content))
    }
}

/// Produces a fixed Streamlit skeleton that echoes the prompt. Needs no network.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

#[async_trait]
impl CodeGenerator for OfflineGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        // JSON string literals are valid Python string literals.
        let literal = serde_json::to_string(prompt).unwrap_or_else(|_| "\"\"".to_string());
        Ok(format!(
            "import streamlit as st\n\
             \n\
             st.set_page_config(page_title=\"Generated app\")\n\
             st.title(\"Generated app\")\n\
             st.caption({literal})\n\
             \n\
             name = st.text_input(\"Your name\")\n\
             if name:\n    st.write(f\"Hello, {{name}}!\")\n"
        ))
    }
}

/// Stands in when the configured backend could not be built; every call fails.
#[derive(Debug, Clone)]
pub struct UnavailableGenerator {
    reason: String,
}

impl UnavailableGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CodeGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured(self.reason.clone()))
    }
}

/// Removes a surrounding Markdown code fence (```` ```python ... ``` ````), if any.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return format!("{trimmed}\n");
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => "",
    };
    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    format!("{}\n", body.trim_end())
}

#[cfg(test)]
#[path = "tests/generation_tests.rs"]
mod tests;
