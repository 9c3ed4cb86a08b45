use thiserror::Error;

/// Main error type for disgate
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network-level failure (endpoint resolution or socket I/O), typically transient
    #[error("network error: {0}")]
    Network(String),

    /// TLS/certificate validation failure, surfaced distinctly from plain network errors
    #[error("security error: {0}")]
    Security(String),

    /// A single inbound message could not be decoded; the message is dropped
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The server violated the gateway contract (bad Hello, forced invalidation)
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Attempted to send while no transport is open
    #[error("not connected")]
    NotConnected,

    /// Channel send error
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for disgate operations
pub type Result<T> = std::result::Result<T, GatewayError>;
