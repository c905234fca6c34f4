use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{BackendConfig, StreamConfig};
use crate::error::{Result, StreamError};
use crate::source::{ByteStream, ConnectFuture};
use crate::streaming::{
    ChatFormat, ChatSession, FrameFormat, ProgressFormat, ProgressSession, StreamSession,
};

/// Body of a chat streaming request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            model: None,
            agent_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// HTTP client for the chat backend's streaming endpoints
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
    stream: StreamConfig,
}

impl BackendClient {
    pub fn new(config: BackendConfig, stream: StreamConfig) -> Result<Self> {
        // No total timeout: chat and pull responses stay open for minutes
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| StreamError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            stream,
        })
    }

    /// Stream tokens for one chat message
    pub fn chat(&self, request: &ChatRequest) -> ChatSession {
        let url = self.config.url(&self.config.chat_path);
        info!(
            session_id = %request.session_id,
            "Opening chat stream: {}",
            url
        );
        self.open(self.client.post(url).json(request), ChatFormat)
    }

    /// Stream download progress for a model pull
    pub fn pull_model(&self, name: &str) -> ProgressSession {
        let url = self.config.url(&self.config.pull_path);
        info!(model = name, "Opening pull stream: {}", url);
        let body = PullRequest { name, stream: true };
        self.open(self.client.post(url).json(&body), ProgressFormat)
    }

    /// Wrap any request in a session; it is sent on the first pull
    pub fn open<F: FrameFormat>(&self, request: RequestBuilder, format: F) -> StreamSession<F> {
        let connect: ConnectFuture = Box::pin(send_streaming(request));
        StreamSession::new(connect, format, self.stream.clone())
    }
}

async fn send_streaming(request: RequestBuilder) -> Result<ByteStream> {
    let response = request
        .header("Accept", "text/event-stream, application/x-ndjson")
        .send()
        .await
        .map_err(|e| StreamError::Transport(format!("Request failed: {}", e)))?;

    let status = response.status();
    debug!("Backend responded with status: {}", status);

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(StreamError::UpstreamStatus {
            status: status.as_u16(),
            body,
        });
    }

    Ok(Box::pin(response.bytes_stream().map_err(|e| {
        StreamError::Transport(format!("Body read failed: {}", e))
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::SessionState;

    #[test]
    fn test_chat_request_serialization() {
        let mut request = ChatRequest::new("s-1", "hi");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, serde_json::json!({"session_id": "s-1", "message": "hi"}));

        request.model = Some("llama3".to_string());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3");
        assert!(value.get("agent_id").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = BackendConfig {
            // discard port, nothing listens there
            base_url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            ..BackendConfig::default()
        };
        let client = BackendClient::new(config, StreamConfig::default()).unwrap();
        let mut session = client.pull_model("llama3");
        assert_eq!(session.state(), SessionState::Idle);

        let err = session.next_event().await.unwrap().unwrap_err();
        assert!(err.is_transport());
        assert_eq!(session.state(), SessionState::Errored);
    }
}
