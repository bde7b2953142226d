//! LLM providers
//!
//! Models form a closed set. Each [`Model`] belongs to exactly one
//! [`ProviderKind`], and [`ProviderSet`] dispatches a prompt to the provider
//! of the requested model.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{BriefError, Result};

const OPENAI_API_ROOT: &str = "https://api.openai.com";
const GEMINI_API_ROOT: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

/// Models a report can be generated with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    Gpt4oMini,
    Gemini20Flash,
}

impl Model {
    pub const ALL: [Model; 2] = [Model::Gpt4oMini, Model::Gemini20Flash];

    /// Identifier sent to the provider's API
    pub fn id(self) -> &'static str {
        match self {
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Gemini20Flash => "gemini-2.0-flash-001",
        }
    }

    pub fn provider(self) -> ProviderKind {
        match self {
            Model::Gpt4oMini => ProviderKind::OpenAi,
            Model::Gemini20Flash => ProviderKind::Gemini,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self> {
        Model::ALL
            .into_iter()
            .find(|m| m.id() == s)
            .ok_or_else(|| BriefError::UnsupportedModel { model: s.to_string() })
    }
}

/// Provider name to model identifiers, for model pickers
pub fn supported_models() -> Vec<(&'static str, Vec<&'static str>)> {
    let mut grouped: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for model in Model::ALL {
        let provider = model.provider().name();
        match grouped.iter_mut().find(|(name, _)| *name == provider) {
            Some((_, models)) => models.push(model.id()),
            None => grouped.push((provider, vec![model.id()])),
        }
    }
    grouped
}

/// Something that can answer a prompt
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn send_prompt(&self, prompt: &str, model: Model) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_root: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_root(api_key, OPENAI_API_ROOT)
    }

    pub fn with_api_root(api_key: impl Into<String>, api_root: &str) -> Self {
        Self {
            client: Client::new(),
            api_root: api_root.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn send_prompt(&self, prompt: &str, model: Model) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.api_root);
        let body = json!({
            "model": model.id(),
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = provider_status(response).await?;

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BriefError::Provider {
                message: "OpenAI returned no message content".to_string(),
            })
    }
}

#[derive(Deserialize)]
struct GenerateContent {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Google Gemini `generateContent`
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_root: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_root(api_key, GEMINI_API_ROOT)
    }

    pub fn with_api_root(api_key: impl Into<String>, api_root: &str) -> Self {
        Self {
            client: Client::new(),
            api_root: api_root.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn send_prompt(&self, prompt: &str, model: Model) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_root, model.id());
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let response = provider_status(response).await?;

        let generated: GenerateContent = response.json().await?;
        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(BriefError::Provider {
                message: "Gemini returned no text".to_string(),
            });
        }
        Ok(text)
    }
}

async fn provider_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BriefError::Provider {
        message: format!("{}: {}", status, body),
    })
}

/// One configured provider
#[derive(Clone)]
pub enum Provider {
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Gemini(_) => ProviderKind::Gemini,
        }
    }
}

#[async_trait]
impl LlmProvider for Provider {
    async fn send_prompt(&self, prompt: &str, model: Model) -> Result<String> {
        match self {
            Provider::OpenAi(p) => p.send_prompt(prompt, model).await,
            Provider::Gemini(p) => p.send_prompt(prompt, model).await,
        }
    }
}

/// The providers that have credentials, routed by model
#[derive(Clone, Default)]
pub struct ProviderSet {
    providers: Vec<Provider>,
}

impl ProviderSet {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Providers for every API key present in `config`
    pub fn from_config(config: &Config) -> Self {
        let mut providers = Vec::new();
        if let Some(key) = &config.openai_api_key {
            providers.push(Provider::OpenAi(OpenAiProvider::new(key.clone())));
        }
        if let Some(key) = &config.gemini_api_key {
            providers.push(Provider::Gemini(GeminiProvider::new(key.clone())));
        }
        info!(count = providers.len(), "LLM providers configured");
        Self { providers }
    }

    pub fn provider_for(&self, model: Model) -> Result<&Provider> {
        let kind = model.provider();
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| BriefError::InvalidConfig {
                message: format!("no API key configured for {}", kind.name()),
            })
    }

    /// Parse `model` and send `prompt` to its provider
    pub async fn send_prompt_to_model(&self, model: &str, prompt: &str) -> Result<String> {
        let model: Model = model.parse()?;
        self.send_prompt(prompt, model).await
    }
}

#[async_trait]
impl LlmProvider for ProviderSet {
    async fn send_prompt(&self, prompt: &str, model: Model) -> Result<String> {
        let provider = self.provider_for(model)?;
        debug!(model = %model, provider = provider.kind().name(), chars = prompt.len(), "sending prompt");
        provider.send_prompt(prompt, model).await
    }
}
