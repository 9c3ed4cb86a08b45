//! Presence and activity value objects
//!
//! These describe a user's displayed status for the identify handshake and
//! presence-update envelopes. All of them are immutable once built and are
//! discarded right after serialization; nothing retains ownership past the
//! call that produced them.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Displayed online status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

/// Closed set of activity types, serialized as their wire integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Game = 0,
    Streaming = 1,
    Listening = 2,
    Custom = 3,
    Competing = 4,
}

impl Serialize for ActivityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Documented activity flag bits
///
/// `Activity::flags` is a bitmask composed only of these.
pub mod activity_flags {
    pub const INSTANCE: u32 = 1 << 0;
    pub const JOIN: u32 = 1 << 1;
    pub const SPECTATE: u32 = 1 << 2;
    pub const JOIN_REQUEST: u32 = 1 << 3;
    pub const SYNC: u32 = 1 << 4;
    pub const PLAY: u32 = 1 << 5;

    pub const ALL: u32 = INSTANCE | JOIN | SPECTATE | JOIN_REQUEST | SYNC | PLAY;
}

#[derive(Debug, Clone, Serialize)]
pub struct Emoji {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Party {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `[current, max]` pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Secrets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectate: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityTimestamps {
    /// Unix milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

/// One displayed activity
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<ActivityTimestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<Emoji>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party: Option<Party>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Secrets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

impl Activity {
    /// Create a minimal activity of the given type
    pub fn new(name: impl Into<String>, kind: ActivityType) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            created_at: None,
            timestamps: None,
            application_id: None,
            details: None,
            state: None,
            emoji: None,
            party: None,
            assets: None,
            secrets: None,
            instance: None,
            flags: None,
        }
    }
}

/// A user's displayed presence
#[derive(Debug, Clone, Serialize)]
pub struct Presence {
    pub afk: bool,
    pub status: OnlineStatus,
    pub activities: Vec<Activity>,
}

impl Presence {
    pub fn online() -> Self {
        Self {
            afk: false,
            status: OnlineStatus::Online,
            activities: Vec::new(),
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}
