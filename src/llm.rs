//! Relay to the external completion service.
//!
//! One outbound request per inbound prompt, no retries, no streaming. Without a
//! credential the client answers from a fixed placeholder so the endpoint
//! works offline, unless strict mode asks for a hard failure instead.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ApiError, Config};

// ---

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Instruction prepended to every prompt.
pub const PREAMBLE: &str = "Tu es un assistant militaire expert en gestion de bases. \
Réponds en français de manière concise et professionnelle.";

/// Returned in stub mode instead of calling out.
pub const STUB_RESPONSE: &str = "[Mode hors ligne] Aucune clé ANTHROPIC_API_KEY n'est \
configurée : ceci est une réponse simulée de l'assistant.";

#[derive(Debug, Clone)]
enum Mode {
    Provider { api_key: String },
    Stub,
    Unconfigured,
}

/// Completion client, cheap to clone into handler state.
#[derive(Debug, Clone)]
pub struct LlmClient {
    mode: Mode,
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Self {
        // ---
        let mode = match (&config.anthropic_api_key, config.llm_require_api_key) {
            (Some(key), _) => Mode::Provider {
                api_key: key.clone(),
            },
            (None, false) => Mode::Stub,
            (None, true) => Mode::Unconfigured,
        };

        Self {
            mode,
            base_url: config.anthropic_api_url.clone(),
            model: config.anthropic_model.clone(),
            client: Client::new(),
        }
    }

    /// Short label for logs and the health endpoint.
    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            Mode::Provider { .. } => "provider",
            Mode::Stub => "stub",
            Mode::Unconfigured => "unconfigured",
        }
    }

    /// Answer a prompt, either from the provider or from the stub.
    pub async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        // ---
        match &self.mode {
            Mode::Provider { api_key } => self.call_api(api_key, prompt).await,
            Mode::Stub => {
                tracing::debug!("No API key configured, answering from stub");
                Ok(STUB_RESPONSE.to_string())
            }
            Mode::Unconfigured => Err(ApiError::Configuration(
                "ANTHROPIC_API_KEY not configured".to_string(),
            )),
        }
    }

    async fn call_api(&self, api_key: &str, prompt: &str) -> Result<String, ApiError> {
        // ---
        let req = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: format!("{}\n\n{}", PREAMBLE, prompt),
            }],
        };

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Calling completion API"
        );

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Completion API request failed");
            return Err(ApiError::Upstream(body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::Upstream(format!("unreadable response ({}): {}", e, body)))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| ApiError::Upstream(format!("no text content in response: {}", body)))
    }
}
