//! Core client machinery: configuration, endpoint resolution, the transport
//! channel, the heartbeat scheduler, the session state machine, and the
//! public facade.

pub mod client;
pub mod config;
pub mod heartbeat;
pub mod resolver;
pub mod session;
pub mod transport;

pub use client::{ClientEvent, GatewayClient};
pub use config::GatewayConfig;
pub use heartbeat::HeartbeatHandle;
pub use resolver::{EndpointResolver, GatewayEndpoint, ResolveError};
pub use session::{SessionEvent, SessionPhase};
pub use transport::{TransportEvent, TransportHandle};
