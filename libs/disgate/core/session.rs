//! Gateway session state machine
//!
//! The session is the single owner of all protocol state. Everything that can
//! happen (facade commands, resolver results, transport events, heartbeat
//! ticks) arrives as a [`SessionEvent`] on one queue and is handled by one
//! task, so no two handlers ever run concurrently against the same state and
//! no locking is needed.
//!
//! Lifecycle: connect → resolve (unless cached) → open socket → Hello →
//! start heartbeating + Identify → READY → steady state → Closed → cleanup.
//! Heartbeats start immediately after Hello, before READY is confirmed;
//! waiting for READY would get the connection terminated for missing
//! heartbeats.

use crate::core::client::ClientEvent;
use crate::core::config::GatewayConfig;
use crate::core::heartbeat::{spawn_heartbeat, HeartbeatHandle};
use crate::core::resolver::{EndpointResolver, GatewayEndpoint, ResolveError};
use crate::core::transport::{self, TransportEvent, TransportHandle};
use crate::error::GatewayError;
use crate::protocol::{Envelope, Opcode, Presence};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Where the session is in the connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    AwaitingHello,
    Identifying,
    Ready,
}

/// Commands forwarded from the facade
#[derive(Debug)]
pub enum SessionCommand {
    Connect,
    Close,
    UpdatePresence(Presence),
    Shutdown,
}

/// Everything the session task can be woken up by
#[derive(Debug)]
pub enum SessionEvent {
    Command(SessionCommand),
    EndpointResolved(GatewayEndpoint),
    EndpointFailed(ResolveError),
    Transport(TransportEvent),
    HeartbeatTick,
}

enum Flow {
    Continue,
    Shutdown,
}

/// The gateway session
///
/// Owned and driven exclusively by its own event loop ([`Session::run`]).
pub(crate) struct Session {
    config: GatewayConfig,
    phase: SessionPhase,
    /// Resolved endpoint, cached across reconnects within this session
    endpoint: Option<GatewayEndpoint>,
    /// Set exactly once per connection, on Hello; cleared on disconnect
    heartbeat_interval: Option<Duration>,
    /// Last sequence number seen on a Dispatch frame, monotonically upward
    last_sequence: Option<u64>,
    last_heartbeat_acked: bool,
    heartbeat: Option<HeartbeatHandle>,
    transport: Option<TransportHandle>,
    /// Self-sender handed to spawned resolver/transport/heartbeat tasks
    events_tx: UnboundedSender<SessionEvent>,
    notify_tx: crossbeam_channel::Sender<ClientEvent>,
}

impl Session {
    pub(crate) fn new(
        config: GatewayConfig,
        events_tx: UnboundedSender<SessionEvent>,
        notify_tx: crossbeam_channel::Sender<ClientEvent>,
    ) -> Self {
        Self {
            config,
            phase: SessionPhase::Disconnected,
            endpoint: None,
            heartbeat_interval: None,
            last_sequence: None,
            last_heartbeat_acked: false,
            heartbeat: None,
            transport: None,
            events_tx,
            notify_tx,
        }
    }

    /// Drive the session until shutdown
    pub(crate) async fn run(mut self, mut events_rx: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events_rx.recv().await {
            match self.handle_event(event) {
                Flow::Continue => {}
                Flow::Shutdown => break,
            }
        }

        self.teardown();
        info!("Session task exiting");
    }

    fn handle_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Command(SessionCommand::Connect) => self.handle_connect(),
            SessionEvent::Command(SessionCommand::Close) => self.handle_close(),
            SessionEvent::Command(SessionCommand::UpdatePresence(presence)) => {
                self.handle_update_presence(presence)
            }
            SessionEvent::Command(SessionCommand::Shutdown) => {
                self.handle_close();
                return Flow::Shutdown;
            }
            SessionEvent::EndpointResolved(endpoint) => self.handle_resolved(endpoint),
            SessionEvent::EndpointFailed(err) => self.handle_resolve_failed(err),
            SessionEvent::Transport(ev) => self.handle_transport_event(ev),
            SessionEvent::HeartbeatTick => self.handle_tick(),
        }
        Flow::Continue
    }

    // ---- connect path -------------------------------------------------

    fn handle_connect(&mut self) {
        if self.phase != SessionPhase::Disconnected {
            debug!("Connect ignored, session is {:?}", self.phase);
            return;
        }

        self.phase = SessionPhase::Connecting;

        match self.endpoint.clone() {
            Some(endpoint) => {
                info!("Reusing cached gateway endpoint");
                self.open_transport(&endpoint);
            }
            None => {
                let resolver = EndpointResolver::new(self.config.rest_base_url.clone());
                let events_tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let event = match resolver.resolve().await {
                        Ok(endpoint) => SessionEvent::EndpointResolved(endpoint),
                        Err(e) => SessionEvent::EndpointFailed(e),
                    };
                    let _ = events_tx.send(event);
                });
            }
        }
    }

    fn handle_resolved(&mut self, endpoint: GatewayEndpoint) {
        // Cache even a late result; the next connect skips the REST round trip
        self.endpoint = Some(endpoint.clone());

        if self.phase != SessionPhase::Connecting {
            debug!("Endpoint resolved in {:?}, cached without opening", self.phase);
            return;
        }
        self.open_transport(&endpoint);
    }

    fn handle_resolve_failed(&mut self, err: ResolveError) {
        warn!("Gateway endpoint resolution failed: {}", err);
        // Fatal for this attempt: drop any stale cached URL too
        self.endpoint = None;
        self.phase = SessionPhase::Disconnected;
        self.notify(ClientEvent::Error(err.to_string()));
    }

    fn open_transport(&mut self, endpoint: &GatewayEndpoint) {
        self.transport = Some(transport::open(endpoint, self.events_tx.clone()));
    }

    // ---- transport events ----------------------------------------------

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.phase == SessionPhase::Connecting {
                    self.phase = SessionPhase::AwaitingHello;
                    self.notify(ClientEvent::Connected);
                } else {
                    debug!("Dropping stale transport open in {:?}", self.phase);
                }
            }
            TransportEvent::Message(text) => self.handle_frame(&text),
            TransportEvent::TransportError(msg) => {
                error!("Transport error: {}", msg);
                self.notify(ClientEvent::Error(GatewayError::Network(msg).to_string()));
            }
            TransportEvent::SecurityError(msg) => {
                error!("TLS error on gateway connection: {}", msg);
                self.notify(ClientEvent::Error(GatewayError::Security(msg).to_string()));
            }
            TransportEvent::Closed => self.handle_closed(),
        }
    }

    /// Single cleanup path for every teardown, whatever phase we were in
    fn handle_closed(&mut self) {
        if self.transport.is_none() && self.phase == SessionPhase::Disconnected {
            debug!("Dropping stale transport close");
            return;
        }

        warn!("Gateway disconnected, cleaning up");

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        self.heartbeat_interval = None;
        self.last_heartbeat_acked = false;
        self.transport = None;
        self.phase = SessionPhase::Disconnected;
        // The cached endpoint is kept; a reconnect reuses it

        self.notify(ClientEvent::Disconnected);
    }

    // ---- inbound frames -------------------------------------------------

    fn handle_frame(&mut self, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Local, non-fatal: drop the message, keep the connection
                warn!("Dropping malformed gateway frame: {}", e);
                self.notify(ClientEvent::Error(e.to_string()));
                return;
            }
        };

        match envelope.opcode() {
            Opcode::Hello => self.handle_hello(&envelope),
            Opcode::Heartbeat => {
                // Server-requested, out of band from the scheduler
                debug!("Server requested an immediate heartbeat");
                self.send_heartbeat();
            }
            Opcode::HeartbeatAck => {
                self.last_heartbeat_acked = true;
            }
            Opcode::Dispatch => self.handle_dispatch(envelope),
            Opcode::Reconnect | Opcode::InvalidSession => {
                warn!("Server invalidated the session ({:?})", envelope.opcode());
                if let Some(transport) = &self.transport {
                    transport.close();
                }
            }
            Opcode::Identify
            | Opcode::PresenceUpdate
            | Opcode::VoiceStateUpdate
            | Opcode::Resume
            | Opcode::RequestGuildMembers => {
                debug!("Ignoring client-bound opcode {:?}", envelope.opcode());
            }
            Opcode::Unknown(raw) => {
                debug!("Ignoring unknown opcode {}", raw);
            }
        }
    }

    fn handle_hello(&mut self, envelope: &Envelope) {
        let Some(interval_ms) = envelope.d.get("heartbeat_interval").and_then(Value::as_u64)
        else {
            let err =
                GatewayError::ProtocolViolation("hello is missing heartbeat_interval".to_string());
            error!("{}", err);
            self.notify(ClientEvent::Error(err.to_string()));
            if let Some(transport) = &self.transport {
                transport.close();
            }
            return;
        };

        let period = Duration::from_millis(interval_ms);
        self.heartbeat_interval = Some(period);
        self.last_heartbeat_acked = true;

        // A re-Hello restarts the scheduler with the new period
        if let Some(old) = self.heartbeat.take() {
            old.stop();
        }
        self.heartbeat = Some(spawn_heartbeat(period, self.events_tx.clone()));

        info!("Hello received, heartbeating every {:?}", period);

        // Identify goes out before the first tick can possibly fire
        self.send_identify();

        if self.phase == SessionPhase::AwaitingHello {
            self.phase = SessionPhase::Identifying;
        }
    }

    fn handle_dispatch(&mut self, envelope: Envelope) {
        if let Some(seq) = envelope.s {
            if self.last_sequence.map_or(true, |current| seq > current) {
                self.last_sequence = Some(seq);
            }
        }

        let event = envelope.t.unwrap_or_default();

        if event == "READY" && self.phase != SessionPhase::Ready {
            self.phase = SessionPhase::Ready;
            info!("Gateway session ready");
            self.notify(ClientEvent::Ready);
        }

        self.notify(ClientEvent::Dispatch {
            event,
            data: envelope.d,
        });
    }

    // ---- outbound -------------------------------------------------------

    fn send_identify(&mut self) {
        let identify = self.config.identify();
        let d = serde_json::to_value(&identify).expect("identify serialization is infallible");
        self.send_envelope(Envelope::new(Opcode::Identify, d));
        debug!("Sent identify");
    }

    fn send_heartbeat(&mut self) {
        self.send_envelope(Envelope::heartbeat(self.last_sequence));
        self.last_heartbeat_acked = false;
        debug!("Sent heartbeat (s={:?})", self.last_sequence);
    }

    fn handle_tick(&mut self) {
        // A tick can still be queued after a disconnect stopped the scheduler
        if self.heartbeat_interval.is_none() {
            debug!("Dropping stale heartbeat tick");
            return;
        }
        self.send_heartbeat();
    }

    fn handle_update_presence(&mut self, presence: Presence) {
        if self.phase != SessionPhase::Ready {
            warn!("Presence update ignored, session is {:?}", self.phase);
            self.notify(ClientEvent::Error(GatewayError::NotConnected.to_string()));
            return;
        }
        let d = serde_json::to_value(&presence).expect("presence serialization is infallible");
        self.send_envelope(Envelope::new(Opcode::PresenceUpdate, d));
        debug!("Sent presence update");
    }

    fn send_envelope(&mut self, envelope: Envelope) {
        match &self.transport {
            Some(transport) => {
                if let Err(e) = transport.send(envelope.encode()) {
                    warn!("Dropping outbound frame: {}", e);
                }
            }
            None => warn!("Dropping outbound frame, no transport open"),
        }
    }

    // ---- teardown -------------------------------------------------------

    fn handle_close(&mut self) {
        match &self.transport {
            Some(transport) => transport.close(),
            None => debug!("Close ignored, not connected"),
        }
    }

    /// Safe even if nothing was ever started
    fn teardown(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.heartbeat_interval = None;
        self.phase = SessionPhase::Disconnected;
    }

    fn notify(&self, event: ClientEvent) {
        if self.notify_tx.send(event).is_err() {
            debug!("Event receiver dropped, notification lost");
        }
    }
}
