use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Configuration as reported by the relay. The key itself is never returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub has_api_key: bool,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
}

#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfigRequest {
    pub api_url: String,
    pub api_key: String,
}

// Keys stay out of logs and panic messages.
impl fmt::Debug for SaveConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveConfigRequest")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl fmt::Debug for TestConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestConfigRequest")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub config: ChatContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatContext {
    pub timestamp: String,
}

impl ChatRequest {
    pub fn new(message: &str, sent_at: DateTime<Utc>) -> Self {
        Self {
            message: message.to_string(),
            config: ChatContext {
                timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }
}

/// The relay's common response shape.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    config: Option<RemoteConfig>,
}

impl Envelope {
    fn accepted(self) -> Result<Self, ApiError> {
        if self.success {
            Ok(self)
        } else {
            Err(ApiError::rejected(self.error))
        }
    }
}

/// The four relay operations the client depends on.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `Ok(None)` when the relay answers successfully but holds no configuration.
    async fn get_config(&self) -> Result<Option<RemoteConfig>, ApiError>;

    /// Returns the server's confirmation message, if any.
    async fn save_config(&self, request: &SaveConfigRequest) -> Result<Option<String>, ApiError>;

    async fn test_config(&self, request: &TestConfigRequest) -> Result<Option<String>, ApiError>;

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch(&self, request: RequestBuilder) -> Result<Envelope, ApiError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ApiError::transport(format!(
                "relay request failed with status: {}",
                response.status()
            )));
        }

        let envelope: Envelope = response.json().await?;
        envelope.accepted()
    }
}

#[async_trait]
impl ChatApi for HttpBackend {
    async fn get_config(&self) -> Result<Option<RemoteConfig>, ApiError> {
        let envelope = self.fetch(self.client.get(self.url("/api/get-config"))).await?;
        Ok(envelope.config)
    }

    async fn save_config(&self, request: &SaveConfigRequest) -> Result<Option<String>, ApiError> {
        let envelope = self
            .fetch(self.client.post(self.url("/api/save-config")).json(request))
            .await?;
        Ok(envelope.message)
    }

    async fn test_config(&self, request: &TestConfigRequest) -> Result<Option<String>, ApiError> {
        let envelope = self
            .fetch(self.client.post(self.url("/api/test-config")).json(request))
            .await?;
        Ok(envelope.message)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let envelope = self
            .fetch(self.client.post(self.url("/api/chat")).json(request))
            .await?;
        envelope
            .reply
            .ok_or_else(|| ApiError::transport("successful chat response carried no reply"))
    }
}
