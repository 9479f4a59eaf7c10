//! Shared WebSocket connection management.
//!
//! One `ConnectionManager` owns one socket for the whole process. All
//! mutable state — the socket, the subscription registry, the heartbeat and
//! reconnect timers — lives inside a single actor task, so registry
//! mutation, frame routing and state transitions execute one at a time with
//! no locks. Handles and subscriptions talk to the actor over an unbounded
//! command channel; connection state is published through a `watch` channel
//! whose `borrow()` hands new observers the current value immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::time::{self, Instant, Interval};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use types::{Channel, ConnectionState, SubscriptionKey};

use crate::backoff::Backoff;
use crate::config::StreamConfig;
use crate::messages::{self, Inbound};
use crate::registry::{Payload, SubscriberId, SubscriptionRegistry};
use crate::subscription::{ChannelSubscription, SubscriptionGuard};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands sent from handles and subscription guards to the actor.
pub(crate) enum Command {
    Connect,
    Disconnect,
    Subscribe {
        key: SubscriptionKey,
        id: SubscriberId,
        tx: UnboundedSender<Payload>,
    },
    Unsubscribe {
        key: SubscriptionKey,
        id: SubscriberId,
    },
}

/// Handle to the shared connection.
///
/// Cheap to clone; every clone drives the same underlying socket. The
/// instance is meant to be constructed once at the composition root and
/// passed to every consumer — there is deliberately no global accessor.
/// The actor shuts down when the last handle and subscription are gone.
#[derive(Clone)]
pub struct ConnectionManager {
    cmd_tx: UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    next_id: Arc<AtomicU64>,
    config: Arc<StreamConfig>,
}

impl ConnectionManager {
    /// Spawn the connection actor. Must be called inside a Tokio runtime.
    ///
    /// The transport is not opened until [`connect`](Self::connect).
    pub fn new(config: StreamConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let actor = ConnectionActor {
            backoff: Backoff::new(config.base_backoff_ms, config.max_backoff_ms),
            config: config.clone(),
            registry: SubscriptionRegistry::new(),
            state_tx,
            cmd_rx,
            socket: None,
            heartbeat: None,
            reconnect_at: None,
        };
        tokio::spawn(actor.run());

        Self {
            cmd_tx,
            state_rx,
            next_id: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    /// Open the transport. Idempotent — a no-op while the connection is
    /// already open or opening.
    pub fn connect(&self) {
        let _ = self.cmd_tx.send(Command::Connect);
    }

    /// Intentional shutdown: cancels any pending reconnect, stops the
    /// heartbeat and closes the transport without re-entering the reconnect
    /// path. Registered subscriptions stay in the registry and replay on
    /// the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Disconnect);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for connection state changes. `borrow()` always holds
    /// the current state, so new observers need not wait for a transition.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Attach a listener to one `(channel, symbol)` stream.
    ///
    /// The first subscription for a key sends the wire subscribe (or defers
    /// it to the next connect's replay); dropping the returned subscription
    /// releases the listener and the last release sends the wire
    /// unsubscribe.
    pub fn subscribe(&self, channel: Channel, symbol: &str) -> ChannelSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let key = SubscriptionKey::new(channel, symbol);
        let (tx, rx) = mpsc::unbounded_channel();

        let _ = self.cmd_tx.send(Command::Subscribe {
            key: key.clone(),
            id,
            tx,
        });
        let guard = SubscriptionGuard::new(self.cmd_tx.clone(), key, id);
        ChannelSubscription::new(rx, self.state_rx.clone(), guard)
    }

    /// Service configuration, shared with the processors.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

/// What woke the actor up this turn.
enum Event {
    Command(Option<Command>),
    Frame(Option<Result<Message, WsError>>),
    HeartbeatDue,
    ReconnectDue,
}

struct ConnectionActor {
    config: StreamConfig,
    registry: SubscriptionRegistry,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: UnboundedReceiver<Command>,
    socket: Option<WsStream>,
    backoff: Backoff,
    heartbeat: Option<Interval>,
    reconnect_at: Option<Instant>,
}

impl ConnectionActor {
    async fn run(mut self) {
        loop {
            let reconnect_at = self.reconnect_at.unwrap_or_else(Instant::now);

            let event = tokio::select! {
                cmd = self.cmd_rx.recv() => Event::Command(cmd),
                frame = next_frame(&mut self.socket) => Event::Frame(frame),
                _ = heartbeat_due(&mut self.heartbeat) => Event::HeartbeatDue,
                _ = time::sleep_until(reconnect_at), if self.reconnect_at.is_some() => {
                    Event::ReconnectDue
                }
            };

            match event {
                // All handles and subscriptions dropped: total teardown.
                Event::Command(None) => break,
                Event::Command(Some(cmd)) => self.handle_command(cmd).await,
                Event::Frame(Some(Ok(msg))) => self.handle_frame(msg).await,
                Event::Frame(Some(Err(e))) => {
                    warn!(error = %e, "transport error");
                    self.schedule_reconnect();
                }
                Event::Frame(None) => {
                    warn!("transport stream ended");
                    self.schedule_reconnect();
                }
                Event::HeartbeatDue => {
                    self.send_frame(messages::enable_heartbeat_frame()).await;
                }
                Event::ReconnectDue => {
                    self.reconnect_at = None;
                    self.attempt_connect().await;
                }
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => {
                // Idempotent: connecting happens within this actor turn, so
                // an open socket is the only state to guard against. An
                // explicit connect supersedes a pending reconnect timer
                // rather than stacking a second one.
                if self.socket.is_some() {
                    return;
                }
                self.reconnect_at = None;
                self.attempt_connect().await;
            }
            Command::Disconnect => {
                self.reconnect_at = None;
                self.heartbeat = None;
                if let Some(mut ws) = self.socket.take() {
                    let _ = ws.close(None).await;
                }
                self.set_state(ConnectionState::Disconnected);
            }
            Command::Subscribe { key, id, tx } => {
                let became_active = self.registry.add(key.clone(), id, tx);
                debug!(%key, id, became_active, "listener attached");
                if became_active && self.socket.is_some() {
                    self.send_frame(messages::subscribe_frame(key.channel, &key.symbol))
                        .await;
                }
            }
            Command::Unsubscribe { key, id } => {
                let became_inactive = self.registry.remove(&key, id);
                debug!(%key, id, became_inactive, "listener detached");
                if became_inactive && self.socket.is_some() {
                    self.send_frame(messages::unsubscribe_frame(key.channel, &key.symbol))
                        .await;
                }
            }
        }
    }

    async fn handle_frame(&mut self, msg: Message) {
        match msg {
            Message::Text(text) => match messages::parse_inbound(&text) {
                Some(Inbound::Heartbeat) => trace!("heartbeat ack"),
                Some(Inbound::Data {
                    channel,
                    symbol,
                    payload,
                }) => {
                    let delivered = self.registry.route(channel, &symbol, payload);
                    trace!(%channel, %symbol, delivered, "frame routed");
                }
                None => debug!("dropping unrecognized frame"),
            },
            Message::Ping(_) | Message::Pong(_) => {
                // tungstenite answers pings on the next flush
            }
            Message::Close(frame) => {
                warn!(?frame, "server closed the connection");
                self.schedule_reconnect();
            }
            _ => debug!("ignoring non-text frame"),
        }
    }

    async fn attempt_connect(&mut self) {
        self.set_state(ConnectionState::Connecting);
        info!(url = %self.config.ws_url, attempt = self.backoff.attempt(), "connecting");

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match time::timeout(timeout, connect_async(self.config.ws_url.as_str())).await {
            Ok(Ok((ws, response))) => {
                info!(status = ?response.status(), "connected");
                self.socket = Some(ws);
                self.backoff.reset();
                self.reconnect_at = None;
                self.set_state(ConnectionState::Connected);
                self.start_heartbeat().await;
                self.resubscribe_all().await;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "connection failed");
                self.schedule_reconnect();
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.connect_timeout_ms,
                    "connection attempt timed out"
                );
                self.schedule_reconnect();
            }
        }
    }

    async fn start_heartbeat(&mut self) {
        // Enable server heartbeats right away, then keep refreshing them on
        // the interval until the connection drops.
        self.send_frame(messages::enable_heartbeat_frame()).await;
        let period = Duration::from_millis(self.config.heartbeat_interval_ms);
        self.heartbeat = Some(time::interval_at(Instant::now() + period, period));
    }

    /// Full replay, not incremental: every key with at least one listener
    /// gets a fresh wire subscribe after (re)connecting.
    async fn resubscribe_all(&mut self) {
        let keys: Vec<SubscriptionKey> = self.registry.keys().cloned().collect();
        if !keys.is_empty() {
            info!(count = keys.len(), "replaying subscriptions");
        }
        for key in keys {
            self.send_frame(messages::subscribe_frame(key.channel, &key.symbol))
                .await;
        }
    }

    fn schedule_reconnect(&mut self) {
        self.socket = None;
        self.heartbeat = None;
        self.set_state(ConnectionState::Reconnecting);

        let delay = self.backoff.next_delay();
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempt(),
            "reconnect scheduled"
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    /// Best-effort send: silently dropped while the transport is not open.
    /// A dead transport surfaces through the read side, not here.
    async fn send_frame(&mut self, text: String) {
        if let Some(ws) = self.socket.as_mut() {
            if let Err(e) = ws.send(Message::Text(text)).await {
                debug!(error = %e, "frame send failed");
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            info!(%state, "connection state changed");
            self.state_tx.send_replace(state);
        }
    }

    async fn shutdown(&mut self) {
        self.reconnect_at = None;
        self.heartbeat = None;
        if let Some(mut ws) = self.socket.take() {
            let _ = ws.close(None).await;
        }
        self.set_state(ConnectionState::Disconnected);
        debug!("connection actor stopped");
    }
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
    match socket.as_mut() {
        Some(ws) => ws.next().await,
        None => futures_util::future::pending().await,
    }
}

async fn heartbeat_due(heartbeat: &mut Option<Interval>) {
    match heartbeat.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        None => futures_util::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manager_starts_disconnected() {
        let manager = ConnectionManager::new(StreamConfig::default());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_state_watch_replays_current_state() {
        let manager = ConnectionManager::new(StreamConfig::default());
        // A fresh observer sees the current state without waiting for a
        // transition.
        let watch = manager.state_watch();
        assert_eq!(*watch.borrow(), ConnectionState::Disconnected);
    }
}
