use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AssistantError, Result},
    types::ChatMessage,
};

pub const MISSING_KEY_MESSAGE: &str = "Por favor, configure sua API key do DeepSeek primeiro.";
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Erro ao conectar com a API do DeepSeek. Verifique sua conexão ou API key.";
const UNKNOWN_API_ERROR: &str = "Ocorreu um erro desconhecido.";

/// Instructions sent ahead of every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente especializado em programação que responde em português do Brasil. \
Responda sempre em JSON com a estrutura {\"content\": \"sua resposta\", \"files\": [{\"name\": \"caminho/do/arquivo.js\", \"content\": \"conteúdo do arquivo\"}]}. \
O campo \"files\" é opcional e só deve aparecer quando houver código. \
Se não puder responder em JSON, envie cada arquivo em um bloco ```filepath:caminho/do/arquivo seguido do conteúdo e feche com ```. \
Inclua todos os arquivos necessários para o projeto funcionar, como package.json e arquivos de configuração, com caminhos relativos corretos.";

/// Settings for the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API root; `/chat/completions` is appended
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ask the API for a JSON object response
    pub json_mode: bool,
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v3".to_string(),
            model: "deepseek-coder".to_string(),
            temperature: 0.3,
            max_tokens: 8000,
            json_mode: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(AssistantError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.base_url.trim().is_empty() {
            return invalid("base_url must not be empty");
        }
        if self.model.trim().is_empty() {
            return invalid("model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return invalid("temperature must be between 0 and 2");
        }
        if self.max_tokens == 0 {
            return invalid("max_tokens must be positive");
        }
        Ok(())
    }
}

/// JSON envelope carrying a message for the user and no files
pub fn fallback_envelope(message: &str) -> String {
    serde_json::json!({ "content": message }).to_string()
}

/// Message shown to the user in place of a reply that could not be obtained
pub fn fallback_message(error: &AssistantError) -> String {
    match error {
        AssistantError::MissingApiKey => MISSING_KEY_MESSAGE.to_string(),
        AssistantError::Api { message } => format!("Erro na API: {}", message),
        _ => CONNECTION_ERROR_MESSAGE.to_string(),
    }
}

/// A service that continues a conversation with a model
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Send the conversation and return the raw text of the model's reply
    async fn request(&self, conversation: &[ChatMessage], api_key: &str) -> Result<String>;

    /// Human-readable identifier for logging
    fn identifier(&self) -> String;

    /// Like `request`, but failures come back as a fallback JSON envelope
    ///
    /// The returned string can always be handed to the response parser.
    async fn complete(&self, conversation: &[ChatMessage], api_key: &str) -> String {
        let result = if api_key.trim().is_empty() {
            Err(AssistantError::MissingApiKey)
        } else {
            self.request(conversation, api_key).await
        };

        match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("completion via {} failed: {}", self.identifier(), e);
                fallback_envelope(&fallback_message(&e))
            }
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// DeepSeek-compatible chat-completions client
#[derive(Clone)]
pub struct DeepSeekClient {
    client: Client,
    config: CompletionConfig,
}

impl DeepSeekClient {
    /// Create a client with its own HTTP connection pool
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("code-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, config)
    }

    /// Create a client that shares an existing `reqwest::Client`
    pub fn with_client(client: Client, config: CompletionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, conversation: &'a [ChatMessage]) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: &self.config.system_prompt,
        });
        messages.extend(conversation.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: self.config.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl CompletionSource for DeepSeekClient {
    async fn request(&self, conversation: &[ChatMessage], api_key: &str) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(AssistantError::MissingApiKey);
        }

        let body = self.build_request(conversation);
        debug!(
            "sending {} messages to {}",
            body.messages.len(),
            self.endpoint()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<CompletionResponse>(&text).ok();

        // The API reports failures in the body, sometimes with a 200 status
        if let Some(error) = parsed.as_ref().and_then(|p| p.error.as_ref()) {
            return Err(AssistantError::Api {
                message: error
                    .message
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string()),
            });
        }

        match status {
            status if status.is_success() => parsed
                .and_then(|p| p.choices.into_iter().next())
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| AssistantError::InvalidResponse {
                    message: "response has no message content".to_string(),
                }),
            StatusCode::UNAUTHORIZED => Err(AssistantError::Api {
                message: "API key recusada pelo servidor.".to_string(),
            }),
            status => Err(AssistantError::Api {
                message: format!("status inesperado {}: {}", status, text),
            }),
        }
    }

    fn identifier(&self) -> String {
        format!("{} ({})", self.endpoint(), self.config.model)
    }
}
