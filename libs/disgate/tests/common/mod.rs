//! Common test utilities for disgate integration tests
//!
//! Provides a scripted mock gateway (WebSocket) server and a minimal REST
//! responder for endpoint resolution.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Notify;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug)]
enum ServerCommand {
    Send(String),
    Close,
}

struct GatewayState {
    hello_interval_ms: u64,
    frames: Mutex<Vec<Value>>,
    current_conn: Mutex<Option<UnboundedSender<ServerCommand>>>,
}

/// A mock gateway server speaking just enough of the protocol for tests
///
/// On every new connection it sends Hello with the configured heartbeat
/// interval, answers Identify with a READY dispatch (s=1) and every
/// heartbeat with a HeartbeatAck, and records all received frames.
pub struct MockGatewayServer {
    pub addr: SocketAddr,
    state: Arc<GatewayState>,
    shutdown: Arc<Notify>,
}

impl MockGatewayServer {
    pub async fn start(hello_interval_ms: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let state = Arc::new(GatewayState {
            hello_interval_ms,
            frames: Mutex::new(Vec::new()),
            current_conn: Mutex::new(None),
        });

        let shutdown_clone = shutdown.clone();
        let state_clone = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let state = state_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, state).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, state: Arc<GatewayState>) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        *state.current_conn.lock().unwrap() = Some(cmd_tx);

        let hello = json!({"op": 10, "d": {"heartbeat_interval": state.hello_interval_ms}});
        if write.send(Message::Text(hello.to_string())).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let frame: Value = match serde_json::from_str(&text) {
                                Ok(v) => v,
                                Err(_) => continue,
                            };
                            let op = frame["op"].as_u64();
                            state.frames.lock().unwrap().push(frame);

                            let reply = match op {
                                // Identify: acknowledge with READY
                                Some(2) => Some(json!({"op": 0, "s": 1, "t": "READY", "d": {}})),
                                // Heartbeat: acknowledge
                                Some(1) => Some(json!({"op": 11})),
                                _ => None,
                            };
                            if let Some(reply) = reply {
                                if write.send(Message::Text(reply.to_string())).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ServerCommand::Send(text)) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(ServerCommand::Close) | None => {
                            let _ = write.close().await;
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Base WebSocket URL (what the REST lookup should hand out)
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Frames received so far, as parsed JSON
    pub fn received_frames(&self) -> Vec<Value> {
        self.state.frames.lock().unwrap().clone()
    }

    /// Opcodes of the frames received so far, in order
    pub fn received_opcodes(&self) -> Vec<u64> {
        self.received_frames()
            .iter()
            .filter_map(|f| f["op"].as_u64())
            .collect()
    }

    /// Push a raw frame to the currently connected client
    pub fn send_raw(&self, text: impl Into<String>) {
        if let Some(tx) = self.state.current_conn.lock().unwrap().as_ref() {
            let _ = tx.send(ServerCommand::Send(text.into()));
        }
    }

    /// Drop the current connection, simulating a server-side disconnect
    pub fn close_current(&self) {
        if let Some(tx) = self.state.current_conn.lock().unwrap().as_ref() {
            let _ = tx.send(ServerCommand::Close);
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockGatewayServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A minimal one-endpoint REST responder for gateway URL resolution
///
/// Answers every request with the configured body and counts hits.
pub struct MockApiServer {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
}

impl MockApiServer {
    /// Start a server answering `{"url": "<ws_url>"}`
    pub async fn start(ws_url: &str) -> Self {
        Self::start_with_body(json!({"url": ws_url}).to_string()).await
    }

    /// Start a server answering the given raw body
    pub async fn start_with_body(body: String) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let hits_clone = hits.clone();
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((mut stream, _)) => {
                                hits_clone.fetch_add(1, Ordering::SeqCst);
                                let body = body.clone();
                                tokio::spawn(async move {
                                    let mut buf = [0u8; 4096];
                                    let _ = stream.read(&mut buf).await;
                                    let response = format!(
                                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                                        body.len(),
                                        body
                                    );
                                    let _ = stream.write_all(response.as_bytes()).await;
                                    let _ = stream.shutdown().await;
                                });
                            }
                            Err(_) => break,
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            hits,
            shutdown,
        }
    }

    /// REST base URL to point a resolver at
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests served
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockApiServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
