//! Transport channel
//!
//! Owns one physical WebSocket connection in a spawned task. Knows nothing
//! about protocol semantics: frames go out via commands, connection-level
//! events come back on the session queue. Every connection attempt ends by
//! emitting exactly one `Closed`, whether the teardown was graceful or
//! failure-induced, so the session has a single cleanup path.

use crate::core::resolver::GatewayEndpoint;
use crate::core::session::SessionEvent;
use crate::error::{GatewayError, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Connection-level events emitted by the transport task
#[derive(Debug)]
pub enum TransportEvent {
    /// Socket opened; emitted exactly once per successful open
    Opened,
    /// One inbound text frame
    Message(String),
    /// Socket-level failure (connect or I/O)
    TransportError(String),
    /// TLS/certificate validation failure, surfaced distinctly
    SecurityError(String),
    /// Connection torn down; emitted exactly once per attempt
    Closed,
}

#[derive(Debug)]
pub(crate) enum TransportCommand {
    Send(String),
    Close,
}

/// Handle to a running transport task
#[derive(Debug, Clone)]
pub struct TransportHandle {
    command_tx: UnboundedSender<TransportCommand>,
}

impl TransportHandle {
    #[cfg(test)]
    pub(crate) fn stub(command_tx: UnboundedSender<TransportCommand>) -> Self {
        Self { command_tx }
    }

    /// Queue one text frame for sending
    ///
    /// Fails with `NotConnected` once the transport task has exited; the
    /// frame is dropped with no other side effect.
    pub fn send(&self, frame: String) -> Result<()> {
        self.command_tx
            .send(TransportCommand::Send(frame))
            .map_err(|_| GatewayError::NotConnected)
    }

    /// Ask the transport to close. Safe to call at any time, including after
    /// the task has already exited.
    pub fn close(&self) {
        let _ = self.command_tx.send(TransportCommand::Close);
    }
}

/// Open a connection to the endpoint
///
/// Spawns the socket task and returns immediately; the outcome arrives as
/// `Opened` or an error event followed by `Closed` on the session queue.
pub fn open(endpoint: &GatewayEndpoint, events_tx: UnboundedSender<SessionEvent>) -> TransportHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let url = endpoint.connect_url();

    tokio::spawn(run_transport(url, command_rx, events_tx));

    TransportHandle { command_tx }
}

async fn run_transport(
    url: String,
    mut command_rx: UnboundedReceiver<TransportCommand>,
    events_tx: UnboundedSender<SessionEvent>,
) {
    let emit = |event: TransportEvent| {
        if events_tx.send(SessionEvent::Transport(event)).is_err() {
            debug!("Session queue closed, dropping transport event");
        }
    };

    match connect_async(&url).await {
        Ok((ws_stream, _)) => {
            info!("Connected to gateway at {}", url);
            emit(TransportEvent::Opened);

            if let Err(e) = drive_connection(ws_stream, &mut command_rx, &emit).await {
                error!("Gateway socket error: {}", e);
                emit(classify_error(&e));
            }
        }
        Err(e) => {
            error!("Failed to connect to {}: {}", url, e);
            emit(classify_error(&e));
        }
    }

    emit(TransportEvent::Closed);
    debug!("Transport task exiting");
}

/// Pump the socket until it closes or a `Close` command arrives
async fn drive_connection(
    ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    command_rx: &mut UnboundedReceiver<TransportCommand>,
    emit: &impl Fn(TransportEvent),
) -> std::result::Result<(), WsError> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => emit(TransportEvent::Message(text)),
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame, gateway protocol is text");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Server closed the socket: {:?}", frame);
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        warn!("Gateway stream ended");
                        return Ok(());
                    }
                }
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(TransportCommand::Send(frame)) => {
                        write.send(Message::Text(frame)).await?;
                    }
                    Some(TransportCommand::Close) | None => {
                        debug!("Closing gateway socket");
                        let _ = write.close().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn classify_error(e: &WsError) -> TransportEvent {
    match e {
        WsError::Tls(tls) => TransportEvent::SecurityError(tls.to_string()),
        other => TransportEvent::TransportError(other.to_string()),
    }
}
