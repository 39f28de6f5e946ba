use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::services::LanguageModelService;

const SYSTEM_PROMPT: &str = "Generate a short, professional, programming-related commit message. No explanations, no prefixes, just the commit message.";
const USER_PROMPT: &str = "Generate a short commit message.";

/// Client for an Ollama-compatible `/api/chat` endpoint.
pub struct OllamaClient {
    http: Client,
    host: String,
    model: String,
}

impl OllamaClient {
    pub fn new(host: String, model: String) -> Self {
        Self {
            http: Client::new(),
            host,
            model,
        }
    }

    fn chat_endpoint(host: &str) -> String {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}/api/chat")
        } else {
            format!("http://{host}/api/chat")
        }
    }
}

#[async_trait]
impl LanguageModelService for OllamaClient {
    async fn generate_commit_message(&self) -> AppResult<String> {
        let request_body = ChatRequest::new(&self.model, SYSTEM_PROMPT, USER_PROMPT);
        tracing::debug!(model = %self.model, host = %self.host, "requesting commit message");

        let response = self
            .http
            .post(Self::chat_endpoint(&self.host))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|err| AppError::LanguageModel(format!("failed to call Ollama: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::LanguageModel(format!(
                "Ollama responded with {status}: {body}"
            )));
        }

        let payload: ChatResponse = response.json().await.map_err(|err| {
            AppError::LanguageModel(format!("failed to parse Ollama response: {err}"))
        })?;

        Ok(payload.message.content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, system: &'a str, user: &'a str) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
