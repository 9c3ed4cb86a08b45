//! Wire-level types for the gateway protocol
//!
//! Everything in this module is a plain value object: envelopes, the identify
//! handshake payload, and the presence/activity tree. Nothing here holds
//! state or talks to the network.

pub mod envelope;
pub mod identify;
pub mod presence;

pub use envelope::{Envelope, Opcode};
pub use identify::{intents, ConnectionProperties, Identify};
pub use presence::{
    activity_flags, Activity, ActivityTimestamps, ActivityType, Assets, Emoji, OnlineStatus,
    Party, Presence, Secrets,
};
