//! Gateway envelope codec
//!
//! Every message on the gateway socket is one JSON text frame of the shape
//! `{"op": <int>, "d": <any>, "s": <int|null>, "t": <string|null>}`.
//! Decoding tolerates unknown fields; a frame without an opcode or that is
//! not well-formed JSON fails with `MalformedPayload` and is dropped by the
//! session without tearing down the connection.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of opcodes the client recognizes
///
/// Anything outside this set decodes to `Unknown` and is ignored by the
/// session (no state change, no error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Dispatch,
    Heartbeat,
    Identify,
    PresenceUpdate,
    VoiceStateUpdate,
    Resume,
    Reconnect,
    RequestGuildMembers,
    InvalidSession,
    Hello,
    HeartbeatAck,
    Unknown(u64),
}

impl From<u64> for Opcode {
    fn from(raw: u64) -> Self {
        match raw {
            0 => Opcode::Dispatch,
            1 => Opcode::Heartbeat,
            2 => Opcode::Identify,
            3 => Opcode::PresenceUpdate,
            4 => Opcode::VoiceStateUpdate,
            6 => Opcode::Resume,
            7 => Opcode::Reconnect,
            8 => Opcode::RequestGuildMembers,
            9 => Opcode::InvalidSession,
            10 => Opcode::Hello,
            11 => Opcode::HeartbeatAck,
            other => Opcode::Unknown(other),
        }
    }
}

impl Opcode {
    /// Wire value of this opcode
    pub fn as_u64(self) -> u64 {
        match self {
            Opcode::Dispatch => 0,
            Opcode::Heartbeat => 1,
            Opcode::Identify => 2,
            Opcode::PresenceUpdate => 3,
            Opcode::VoiceStateUpdate => 4,
            Opcode::Resume => 6,
            Opcode::Reconnect => 7,
            Opcode::RequestGuildMembers => 8,
            Opcode::InvalidSession => 9,
            Opcode::Hello => 10,
            Opcode::HeartbeatAck => 11,
            Opcode::Unknown(raw) => raw,
        }
    }
}

/// One complete protocol message unit
///
/// Immutable once constructed. Produced by `decode` for inbound frames and by
/// the session for outbound ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Raw opcode; use [`Envelope::opcode`] for the typed view. Wide enough
    /// that any integer the server sends decodes as `Unknown` rather than
    /// failing as malformed.
    pub op: u64,
    /// Sequence number, present on Dispatch frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Event name, present on Dispatch frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Opaque payload; explicit `null` on the wire when absent
    #[serde(default)]
    pub d: Value,
}

impl Envelope {
    /// Create an outbound envelope with the given opcode and payload
    pub fn new(op: Opcode, d: Value) -> Self {
        Self {
            op: op.as_u64(),
            s: None,
            t: None,
            d,
        }
    }

    /// Build a heartbeat envelope carrying the last seen sequence number
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        let d = match last_sequence {
            Some(seq) => Value::from(seq),
            None => Value::Null,
        };
        Self {
            op: Opcode::Heartbeat.as_u64(),
            s: None,
            t: None,
            d,
        }
    }

    /// Typed view of the opcode field
    pub fn opcode(&self) -> Opcode {
        Opcode::from(self.op)
    }

    /// Decode one inbound text frame
    ///
    /// Unknown fields are skipped. A missing `op` field or malformed JSON
    /// yields `MalformedPayload`; the caller drops the message and keeps the
    /// connection.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GatewayError::MalformedPayload(e.to_string()))
    }

    /// Encode for the wire
    ///
    /// Serializing an envelope cannot fail; if it ever does it is a
    /// programming error, not a runtime condition.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("envelope serialization is infallible")
    }
}
