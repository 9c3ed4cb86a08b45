//! Gateway endpoint resolution
//!
//! One-shot REST lookup of the WebSocket URL. No retry lives here; retry
//! policy belongs to whoever calls `resolve`.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default REST base URL for endpoint resolution
pub const DEFAULT_REST_BASE_URL: &str = "https://discord.com/api/v6";

/// Protocol version appended to the connect URL
pub const GATEWAY_VERSION: u8 = 6;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// Transient transport-level failure
    #[error("gateway request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an empty body, violating the contract
    #[error("gateway response returned an empty body")]
    EmptyResponse,

    /// The server answered with a body we could not interpret
    #[error("failed to parse gateway response: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// A resolved gateway connection endpoint
///
/// Wraps the base WebSocket URL the REST API handed out. The session caches
/// one of these for its whole lifetime and reuses it across reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    base_url: String,
}

impl GatewayEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Full URL to open the socket against, with version/encoding parameters
    pub fn connect_url(&self) -> String {
        format!(
            "{}/?v={}&encoding=json",
            self.base_url.trim_end_matches('/'),
            GATEWAY_VERSION
        )
    }
}

/// Performs the one-shot gateway URL lookup
pub struct EndpointResolver {
    rest_base_url: String,
    client: Client,
}

impl EndpointResolver {
    pub fn new(rest_base_url: impl Into<String>) -> Self {
        Self {
            rest_base_url: rest_base_url.into(),
            client: Client::new(),
        }
    }

    /// Resolve the gateway endpoint with a single `GET {base}/gateway`
    pub async fn resolve(&self) -> Result<GatewayEndpoint> {
        let url = format!("{}/gateway", self.rest_base_url.trim_end_matches('/'));

        debug!("Resolving gateway endpoint from {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        if body.is_empty() {
            return Err(ResolveError::EmptyResponse);
        }

        let value: Value =
            serde_json::from_slice(&body).map_err(|e| ResolveError::Parse(e.to_string()))?;

        match value.get("url").and_then(Value::as_str) {
            Some(ws_url) if !ws_url.is_empty() => {
                debug!("Resolved gateway url {}", ws_url);
                Ok(GatewayEndpoint::new(ws_url))
            }
            _ => Err(ResolveError::Parse(
                "response is missing the \"url\" field".to_string(),
            )),
        }
    }
}
