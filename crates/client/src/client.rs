//! Low-level HTTP client for the Bookswap API.
//!
//! [`ApiClient`] owns the transport: URL assembly, envelope decoding, and
//! HTTP status mapping. It attaches no credentials; authenticated traffic
//! goes through [`crate::session::AuthSession`].

use crate::error::ClientError;
use crate::types::{ApiEnvelope, SUCCESS_CODE};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::Duration;
use url::Url;

/// Bookswap API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder without credentials
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Execute a request and decode the response envelope
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        self.execute_request(request.build()?).await
    }

    /// Execute an already-built request and decode the response envelope
    pub async fn execute_request<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T, ClientError> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;
        decode_envelope(status, &body)
    }

    /// Execute a request whose envelope carries no meaningful result
    pub async fn execute_unit(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(), ClientError> {
        let response = self.client.execute(request.build()?).await?;
        let status = response.status();
        let body = response.text().await?;
        decode_envelope_code(status, &body)
    }
}

/// Builder for ApiClient
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        Url::parse(&base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent("bookswap-client/0.1.0");
        }

        let client = client_builder.build()?;

        Ok(ApiClient { client, base_url })
    }
}

fn decode_envelope<T: serde::de::DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, ClientError> {
    if !status.is_success() {
        return Err(ClientError::from_status(status, error_message(status, body)));
    }

    let envelope: ApiEnvelope<T> = serde_json::from_str(body)?;
    if envelope.code != SUCCESS_CODE {
        return Err(ClientError::Api {
            code: envelope.code,
            message: envelope
                .message
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }
    envelope.result.ok_or_else(|| ClientError::Api {
        code: envelope.code,
        message: "response envelope carried no result".to_string(),
    })
}

fn decode_envelope_code(status: StatusCode, body: &str) -> Result<(), ClientError> {
    if !status.is_success() {
        return Err(ClientError::from_status(status, error_message(status, body)));
    }

    let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(body)?;
    if envelope.code != SUCCESS_CODE {
        return Err(ClientError::Api {
            code: envelope.code,
            message: envelope
                .message
                .unwrap_or_else(|| "request failed".to_string()),
        });
    }
    Ok(())
}

/// Prefer the server's envelope message over the raw body for error display
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        })
}
