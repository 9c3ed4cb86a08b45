//! Client facade
//!
//! Public entry point for embedding applications. The facade forwards
//! commands into the session task and hands lifecycle notifications back on
//! a channel; it never exposes opcodes, envelopes, or state-machine
//! internals.

use crate::core::config::GatewayConfig;
use crate::core::session::{Session, SessionCommand, SessionEvent};
use crate::error::{GatewayError, Result};
use crate::protocol::Presence;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Notifications delivered to the embedding application
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The session completed its handshake and is live
    Ready,
    /// The socket opened (handshake not yet complete)
    Connected,
    /// The connection was torn down; call `connect` again to re-establish
    Disconnected,
    /// Something went wrong; the session may or may not still be up
    Error(String),
    /// A server event, by name, with its payload
    Dispatch { event: String, data: Value },
}

/// A gateway client
///
/// Owns the session task. Commands are fire-and-forget into the session's
/// serialized event loop; notifications come back via [`recv_event`] /
/// [`try_recv_event`].
///
/// [`recv_event`]: GatewayClient::recv_event
/// [`try_recv_event`]: GatewayClient::try_recv_event
pub struct GatewayClient {
    command_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: crossbeam_channel::Receiver<ClientEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl GatewayClient {
    /// Create a client and spawn its session task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: GatewayConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = crossbeam_channel::unbounded();

        let session = Session::new(config, events_tx.clone(), notify_tx);
        let task_handle = tokio::spawn(session.run(events_rx));

        Self {
            command_tx: events_tx,
            event_rx: notify_rx,
            task_handle: Some(task_handle),
        }
    }

    /// Start connecting
    ///
    /// Idempotent: while the session is already connecting or live this is a
    /// no-op. A previously resolved endpoint is reused without another REST
    /// lookup.
    pub fn connect(&self) -> Result<()> {
        self.command(SessionCommand::Connect)
    }

    /// Close the current connection, if any
    pub fn close(&self) -> Result<()> {
        self.command(SessionCommand::Close)
    }

    /// Announce a new presence on the live session
    pub fn update_presence(&self, presence: Presence) -> Result<()> {
        self.command(SessionCommand::UpdatePresence(presence))
    }

    /// Try to receive a notification (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a notification (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Receive a notification, waiting at most `timeout`
    pub fn recv_event_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<ClientEvent, crossbeam_channel::RecvTimeoutError> {
        self.event_rx.recv_timeout(timeout)
    }

    /// Shut the client down and wait for the session task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down gateway client");

        let _ = self.command_tx.send(SessionEvent::Command(SessionCommand::Shutdown));

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }

        Ok(())
    }

    fn command(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(SessionEvent::Command(command))
            .map_err(|e| GatewayError::ChannelSend(e.to_string()))
    }
}
