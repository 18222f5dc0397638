use crate::payments::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::warn;

/// Outbound HTTPS capability injected into the gateway adapters. One trait
/// object per process; test doubles script responses through it.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        body: &JsonValue,
    ) -> PaymentResult<JsonValue>;

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> PaymentResult<JsonValue>;
}

/// reqwest-backed transport. Single-shot: this layer never retries. A failed
/// initiation is surfaced and the caller re-submits. Timeout policy lives in
/// the underlying client configuration.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            PaymentError::GatewayUnreachable {
                message: format!("failed to initialize HTTP client: {}", e),
            }
        })?;
        Ok(Self { client })
    }

    async fn decode(response: reqwest::Response) -> PaymentResult<JsonValue> {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        // Gateways answer rejections with a JSON body and a non-2xx status;
        // the adapter inspects the body, so a parseable body is returned as-is.
        match serde_json::from_str::<JsonValue>(&text) {
            Ok(body) => Ok(body),
            Err(_) => {
                warn!(status = %status, "gateway returned a non-JSON body");
                Err(PaymentError::GatewayRejected {
                    gateway: "http".to_string(),
                    message: format!("HTTP {}: {}", status, text),
                })
            }
        }
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: Option<&str>,
        body: &JsonValue,
    ) -> PaymentResult<JsonValue> {
        let mut request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnreachable {
                message: format!("gateway request failed: {}", e),
            })?;
        Self::decode(response).await
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> PaymentResult<JsonValue> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnreachable {
                message: format!("gateway request failed: {}", e),
            })?;
        Self::decode(response).await
    }
}
