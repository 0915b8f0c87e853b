//! HTTP client for the agent's session API

use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::AgentError;
use crate::response::AgentResponse;

/// Longest error body kept in `AgentError::Status`.
const MAX_ERROR_BODY: usize = 500;

/// Connection and model settings for the agent service.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub username: String,
    /// Basic auth is only sent when a non-empty password is set.
    pub password: Option<String>,
    pub provider_id: String,
    pub model_id: String,
    /// Project directory forwarded as the `directory` query parameter.
    pub directory: Option<String>,
    /// Upper bound on a single remote call.
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:4096".to_string(),
            username: "opencode".to_string(),
            password: None,
            provider_id: "deepseek".to_string(),
            model_id: "deepseek-v3.1".to_string(),
            directory: None,
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl AgentConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: String, password: Option<String>) -> Self {
        self.username = username;
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_model(mut self, provider_id: String, model_id: String) -> Self {
        self.provider_id = provider_id;
        self.model_id = model_id;
        self
    }

    pub fn with_directory(mut self, directory: Option<String>) -> Self {
        self.directory = directory.filter(|d| !d.is_empty());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Thin client over the agent's `session` endpoints.
#[derive(Debug, Clone)]
pub struct OpencodeClient {
    http: Client,
    config: AgentConfig,
}

impl OpencodeClient {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    /// Join a path onto the configured base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(password) = self.config.password.as_deref() {
            builder = builder.basic_auth(&self.config.username, Some(password));
        }
        if let Some(directory) = self.config.directory.as_deref() {
            builder = builder.query(&[("directory", directory)]);
        }
        builder
    }

    /// Send a request and decode the body as JSON.
    async fn execute(&self, request: RequestBuilder) -> Result<Value, AgentError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            warn!("Agent HTTP error (status {}): {}", status, body);
            return Err(AgentError::Status { status, body });
        }

        serde_json::from_str(&body).map_err(|e| AgentError::InvalidJson(e.to_string()))
    }

    /// Create a session and return its id.
    #[instrument(skip(self))]
    pub async fn create_session(&self, title: &str) -> Result<String, AgentError> {
        let request = self
            .request(Method::POST, "session")
            .json(&json!({ "title": title }));
        let value = self.execute(request).await?;

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::UnexpectedShape("session response has no `id`".into()))?;
        debug!("Created session {}", id);
        Ok(id.to_string())
    }

    /// Send one text prompt to a session and return the agent's reply.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn send_prompt(&self, session_id: &str, text: &str) -> Result<AgentResponse, AgentError> {
        let body = json!({
            "providerID": self.config.provider_id,
            "modelID": self.config.model_id,
            "parts": [{ "type": "text", "text": text }],
        });
        let request = self
            .request(Method::POST, &format!("session/{}/message", session_id))
            .json(&body);
        let value = self.execute(request).await?;
        AgentResponse::from_value(value)
    }
}
