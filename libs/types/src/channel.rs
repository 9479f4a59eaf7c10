//! Channel identities, subscription keys and connection lifecycle states.

use std::fmt;

/// Streamed data categories offered by the feed.
///
/// This is a closed set: the multiplexer only routes frames whose `type`
/// field names one of these channels, everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Latest price/volume/funding snapshot per symbol.
    Ticker,
    /// Level-2 orderbook depth per symbol.
    Orderbook,
    /// Public trade prints per symbol.
    Trades,
}

impl Channel {
    /// Every channel, in a fixed order.
    pub const ALL: [Channel; 3] = [Channel::Ticker, Channel::Orderbook, Channel::Trades];

    /// The channel name used on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Channel::Ticker => "v2/ticker",
            Channel::Orderbook => "l2_orderbook",
            Channel::Trades => "all_trades",
        }
    }

    /// Map an inbound frame `type` back to a channel.
    pub fn from_wire(name: &str) -> Option<Channel> {
        match name {
            "v2/ticker" => Some(Channel::Ticker),
            "l2_orderbook" => Some(Channel::Orderbook),
            "all_trades" => Some(Channel::Trades),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Routing and ref-count identity: one channel scoped to one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// The channel being subscribed.
    pub channel: Channel,
    /// The instrument symbol, e.g. `BTCUSD`.
    pub symbol: String,
}

impl SubscriptionKey {
    /// Create a key for `channel` scoped to `symbol`.
    pub fn new(channel: Channel, symbol: impl Into<String>) -> Self {
        Self {
            channel,
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.symbol)
    }
}

/// Connection lifecycle states for the shared WebSocket.
///
/// Process-wide single value observed by every consumer; transport errors
/// are folded into `Reconnecting`/`Disconnected` rather than surfaced as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    #[default]
    Disconnected,
    /// Transport open in progress.
    Connecting,
    /// Transport open, subscriptions live.
    Connected,
    /// Lost the transport, backoff timer pending.
    Reconnecting,
}

impl ConnectionState {
    /// True while the transport is open.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Severity rank for [`ConnectionState::worst`]: higher is less healthy.
    fn severity(self) -> u8 {
        match self {
            ConnectionState::Connected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Reconnecting => 2,
            ConnectionState::Disconnected => 3,
        }
    }

    /// The least healthy state of a set, so a screen consuming several
    /// channels reflects its worst one. An empty set is `Disconnected`.
    pub fn worst(states: impl IntoIterator<Item = ConnectionState>) -> ConnectionState {
        states
            .into_iter()
            .max_by_key(|s| s.severity())
            .unwrap_or(ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}
