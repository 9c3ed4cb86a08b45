//! # disgate
//!
//! A client for a stateful WebSocket gateway protocol: one long-lived
//! connection exchanging small opcoded JSON envelopes, with a
//! hello → identify handshake, a server-dictated heartbeat cadence, and
//! explicit reconnect semantics.
//!
//! ## Architecture
//!
//! - **Envelope codec** (`protocol`): `{op, d, s, t}` frames, tolerant decode
//! - **Endpoint resolver**: one-shot REST lookup of the socket URL, cached
//! - **Transport channel**: one socket connection per task, events out
//! - **Heartbeat scheduler**: fixed-period ticks at the server's cadence
//! - **Gateway session**: the state machine tying it all together on a
//!   single serialized event loop
//! - **Client facade** ([`GatewayClient`]): connect + lifecycle notifications
//!
//! ## Example
//!
//! ```rust,ignore
//! use disgate::{ClientEvent, GatewayClient, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> disgate::Result<()> {
//!     let client = GatewayClient::new(GatewayConfig::from_env()?);
//!     client.connect()?;
//!
//!     while let Ok(event) = client.recv_event() {
//!         match event {
//!             ClientEvent::Ready => println!("session ready"),
//!             ClientEvent::Dispatch { event, .. } => println!("event: {}", event),
//!             ClientEvent::Disconnected => break,
//!             _ => {}
//!         }
//!     }
//!
//!     client.shutdown().await
//! }
//! ```

pub mod core;
pub mod error;
pub mod protocol;

pub use crate::core::{
    ClientEvent, EndpointResolver, GatewayClient, GatewayConfig, GatewayEndpoint, ResolveError,
    SessionPhase,
};
pub use error::{GatewayError, Result};
pub use protocol::{
    intents, Activity, ActivityType, ConnectionProperties, Envelope, Identify, OnlineStatus,
    Opcode, Presence,
};
