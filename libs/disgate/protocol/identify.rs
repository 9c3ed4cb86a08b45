//! Identify handshake payload
//!
//! Built fresh for every identify attempt from the current configuration and
//! never persisted. The token is a secret: `Identify` and
//! `ConnectionProperties` deliberately implement `Debug` by hand so it can
//! never leak into logs.

use crate::protocol::Presence;
use serde::Serialize;
use std::fmt;

/// Event-category bitmask requested at identify time
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    pub const GUILD_BANS: u64 = 1 << 2;
    pub const GUILD_EMOJIS: u64 = 1 << 3;
    pub const GUILD_VOICE_STATES: u64 = 1 << 7;
    pub const GUILD_PRESENCES: u64 = 1 << 8;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
    pub const GUILD_MESSAGE_TYPING: u64 = 1 << 11;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const DIRECT_MESSAGE_REACTIONS: u64 = 1 << 13;
    pub const DIRECT_MESSAGE_TYPING: u64 = 1 << 14;

    /// Everything that does not require privileged approval
    pub const UNPRIVILEGED: u64 = GUILDS
        | GUILD_BANS
        | GUILD_EMOJIS
        | GUILD_VOICE_STATES
        | GUILD_MESSAGES
        | GUILD_MESSAGE_REACTIONS
        | GUILD_MESSAGE_TYPING
        | DIRECT_MESSAGES
        | DIRECT_MESSAGE_REACTIONS
        | DIRECT_MESSAGE_TYPING;
}

/// Platform metadata sent with identify
#[derive(Clone, Serialize)]
pub struct ConnectionProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "disgate".to_string(),
            device: "disgate".to_string(),
        }
    }
}

impl fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProperties")
            .field("os", &self.os)
            .field("browser", &self.browser)
            .field("device", &self.device)
            .finish()
    }
}

/// The identify payload (`d` of an op=2 envelope)
#[derive(Clone, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: ConnectionProperties,
    pub compress: bool,
    pub guild_subscriptions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<Presence>,
    pub intents: u64,
}

impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identify")
            .field("token", &"<redacted>")
            .field("properties", &self.properties)
            .field("compress", &self.compress)
            .field("guild_subscriptions", &self.guild_subscriptions)
            .field("intents", &self.intents)
            .finish()
    }
}
