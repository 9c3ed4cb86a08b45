//! Client configuration
//!
//! The credential is an explicit value handed in at construction, never a
//! compiled-in constant. `Debug` is implemented by hand so the token cannot
//! leak into logs.

use crate::core::resolver::DEFAULT_REST_BASE_URL;
use crate::error::{GatewayError, Result};
use crate::protocol::{intents, ConnectionProperties, Identify, Presence};
use std::fmt;

/// Configuration for a gateway session
#[derive(Clone)]
pub struct GatewayConfig {
    /// Secret authentication token
    pub token: String,
    /// REST base URL used for endpoint resolution
    pub rest_base_url: String,
    /// Event-category bitmask requested at identify time
    pub intents: u64,
    /// Platform metadata sent with identify
    pub properties: ConnectionProperties,
    /// Presence announced at identify time
    pub presence: Option<Presence>,
    pub compress: bool,
    pub guild_subscriptions: bool,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            rest_base_url: DEFAULT_REST_BASE_URL.to_string(),
            intents: intents::UNPRIVILEGED,
            properties: ConnectionProperties::default(),
            presence: None,
            compress: false,
            guild_subscriptions: true,
        }
    }

    /// Load configuration from environment variables
    ///
    /// `DISCORD_TOKEN` is required; `DISCORD_API_URL` and `DISCORD_INTENTS`
    /// override the defaults.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("DISCORD_TOKEN").map_err(|_| {
            GatewayError::Configuration("DISCORD_TOKEN environment variable not set".to_string())
        })?;

        let mut config = Self::new(token);

        if let Ok(url) = std::env::var("DISCORD_API_URL") {
            config.rest_base_url = url;
        }
        if let Ok(raw) = std::env::var("DISCORD_INTENTS") {
            config.intents = raw.parse().map_err(|_| {
                GatewayError::Configuration(format!("DISCORD_INTENTS is not an integer: {}", raw))
            })?;
        }

        Ok(config)
    }

    pub fn with_rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into();
        self
    }

    pub fn with_intents(mut self, intents: u64) -> Self {
        self.intents = intents;
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Build a fresh identify payload from the current configuration
    pub fn identify(&self) -> Identify {
        Identify {
            token: self.token.clone(),
            properties: self.properties.clone(),
            compress: self.compress,
            guild_subscriptions: self.guild_subscriptions,
            presence: self.presence.clone(),
            intents: self.intents,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"<redacted>")
            .field("rest_base_url", &self.rest_base_url)
            .field("intents", &self.intents)
            .field("compress", &self.compress)
            .field("guild_subscriptions", &self.guild_subscriptions)
            .finish()
    }
}
