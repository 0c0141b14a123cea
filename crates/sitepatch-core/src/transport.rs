//! Chat-completion transport to an OpenAI-compatible local model server.

use crate::config::LmStudioConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

/// Raw response body, fragmented however the network delivers it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of a streaming chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    /// Creates a streaming request.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            stream: true,
        }
    }
}

/// Source of model output and model listings.
///
/// Implemented over HTTP by [`LmStudioClient`]; tests substitute scripted
/// transports.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Starts a chat completion and returns its event-stream body.
    async fn stream_chat(&self, request: ChatRequest) -> Result<ByteStream>;

    /// Lists the ids of the models the server can load.
    async fn list_models(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// HTTP client for LM Studio's OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct LmStudioClient {
    client: Client,
    base_url: String,
}

impl LmStudioClient {
    /// Creates a client from configuration.
    pub fn new(config: &LmStudioConfig) -> Result<Self> {
        Self::with_base_url(config.base_url(), Duration::from_secs(config.timeout_secs))
    }

    /// Creates a client for an explicit base URL (primarily for tests).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sitepatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Network)?;
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            format!("LM Studio returned {status}")
        } else {
            body
        };
        debug!(%status, "model server rejected request");
        Err(Error::Provider(message))
    }
}

#[async_trait]
impl ModelTransport for LmStudioClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<ByteStream> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        info!(model = %request.model, messages = request.messages.len(), "requesting completion");

        let response = self.client.post(&url).json(&request).send().await?;
        let response = Self::check_status(response).await?;
        if response.content_length() == Some(0) {
            return Err(Error::NoResponseBody);
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(Error::Network)),
        ))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        let list: ModelList = response.json().await?;
        debug!(count = list.data.len(), "listed models");
        Ok(list.data.into_iter().map(|entry| entry.id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::sse::collect_content;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    fn client(server: &MockServer) -> LmStudioClient {
        LmStudioClient::with_base_url(server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn request_serializes_openai_shape() {
        let request = ChatRequest::new(
            "qwen",
            vec![ChatMessage::system("s"), ChatMessage::user("u")],
            4096,
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "qwen",
                "messages": [
                    { "role": "system", "content": "s" },
                    { "role": "user", "content": "u" }
                ],
                "max_tokens": 4096,
                "stream": true
            })
        );
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = LmStudioClient::with_base_url(" http://host:1234/ ", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://host:1234");
    }

    #[tokio::test]
    async fn streams_completion_body() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"<p>\"}}]}\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"hi</p>\"}}]}\n\
                    data: [DONE]\n";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "model": "qwen", "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let stream = client(&server)
            .stream_chat(ChatRequest::new("qwen", vec![ChatMessage::user("hi")], 16))
            .await?;
        assert_eq!(collect_content(stream).await?, "<p>hi</p>");
        Ok(())
    }

    #[tokio::test]
    async fn error_status_carries_body_text() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_string("You have exceeded your monthly included credits"),
            )
            .mount(&server)
            .await;

        let result = client(&server)
            .stream_chat(ChatRequest::new("qwen", Vec::new(), 16))
            .await;
        match result {
            Err(err) => assert!(err.is_quota_exceeded()),
            Ok(_) => panic!("expected provider error"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn empty_body_is_reported() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = client(&server)
            .stream_chat(ChatRequest::new("qwen", Vec::new(), 16))
            .await;
        assert!(matches!(result, Err(Error::NoResponseBody)));
        Ok(())
    }

    #[tokio::test]
    async fn lists_model_ids() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    { "id": "qwen2.5-coder-7b", "object": "model" },
                    { "id": "text-embedding-nomic", "object": "model" }
                ]
            })))
            .mount(&server)
            .await;

        let ids = client(&server).list_models().await?;
        assert_eq!(ids, vec!["qwen2.5-coder-7b", "text-embedding-nomic"]);
        Ok(())
    }
}
