//! Wire frames for the exchange feed.
//!
//! Everything on the socket is a JSON text frame. Outbound frames are built
//! here; inbound frames are classified into heartbeats and routable data.
//! Anything malformed or unrecognized classifies to `None` and is dropped
//! by the caller without propagating an error.

use serde_json::{json, Value};
use std::sync::Arc;
use types::Channel;

/// A classified inbound frame.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// Keep-alive acknowledgement; consumed, never routed.
    Heartbeat,
    /// A data frame for one channel and symbol, carrying the raw payload.
    Data {
        /// Channel the frame belongs to.
        channel: Channel,
        /// Symbol the frame is scoped to.
        symbol: String,
        /// The full parsed frame, handed to listeners as-is.
        payload: Arc<Value>,
    },
}

/// Build the subscribe frame for one channel and symbol.
pub fn subscribe_frame(channel: Channel, symbol: &str) -> String {
    channel_frame("subscribe", channel, symbol)
}

/// Build the unsubscribe frame for one channel and symbol.
pub fn unsubscribe_frame(channel: Channel, symbol: &str) -> String {
    channel_frame("unsubscribe", channel, symbol)
}

/// Build the keep-alive enable frame.
pub fn enable_heartbeat_frame() -> String {
    json!({ "type": "enable_heartbeat" }).to_string()
}

fn channel_frame(kind: &str, channel: Channel, symbol: &str) -> String {
    json!({
        "type": kind,
        "payload": {
            "channels": [{ "name": channel.wire_name(), "symbols": [symbol] }]
        }
    })
    .to_string()
}

/// Classify an inbound text frame.
///
/// `None` for malformed JSON, frames without a `type`, and types outside
/// the known channel set.
pub fn parse_inbound(text: &str) -> Option<Inbound> {
    let value: Value = serde_json::from_str(text).ok()?;
    let frame_type = value.get("type")?.as_str()?;

    if frame_type == "heartbeat" {
        return Some(Inbound::Heartbeat);
    }

    let channel = Channel::from_wire(frame_type)?;
    let symbol = value.get("symbol")?.as_str()?.to_string();

    Some(Inbound::Data {
        channel,
        symbol,
        payload: Arc::new(value),
    })
}
