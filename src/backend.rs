use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of `POST /api/ask`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub message: String,
    pub location: Option<String>,
    pub consent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub is_crisis: Option<bool>,
    #[serde(default)]
    pub helpline: Option<String>,
}

impl AskResponse {
    pub fn text(response: &str) -> Self {
        Self {
            response: response.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned status {status}")]
    Status { status: u16 },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request task aborted: {0}")]
    Aborted(String),
}

/// The conversational endpoint the controller talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub const ASK_PATH: &'static str = "/api/ask";

    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn ask_url(&self) -> String {
        format!("{}{}", self.base_url, Self::ASK_PATH)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, BackendError> {
        let response = self
            .client
            .post(self.ask_url())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                status: response.status().as_u16(),
            });
        }

        // Decode separately so a bad body surfaces as Decode, not Transport
        let body = response.text().await?;
        let parsed: AskResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
