//! Trade feed processor: bounded newest-first history with transient
//! highlighting.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;
use types::{Channel, ConnectionState, Trade, TradeSide};

use crate::connection::ConnectionManager;
use crate::subscription::ChannelSubscription;

/// Values at or above this are already microsecond-resolution; anything
/// smaller is seconds or milliseconds and gets scaled up.
const MICROS_THRESHOLD: u64 = 1_000_000_000_000_000;

/// One trade as it appears on the wire, single or inside a batch.
#[derive(Debug, Deserialize)]
struct RawTrade {
    #[serde(default = "zero", deserialize_with = "types::de::string_or_number")]
    price: String,
    #[serde(default = "zero", deserialize_with = "types::de::string_or_number")]
    size: String,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    buyer_role: Option<String>,
    #[serde(default)]
    seller_role: Option<String>,
    #[serde(default)]
    timestamp: Option<u64>,
}

fn zero() -> String {
    "0".to_string()
}

/// Live trade feed view model for one symbol: newest first, capped at the
/// configured history limit.
pub struct TradeFeed {
    rx: watch::Receiver<Vec<Trade>>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl TradeFeed {
    /// Subscribe `symbol`'s trades channel and start the processor.
    pub fn new(manager: &ConnectionManager, symbol: &str) -> Self {
        let sub = manager.subscribe(Channel::Trades, symbol);
        let state_rx = sub.state_watch();
        let limit = manager.config().trade_history_limit;
        let highlight = Duration::from_millis(manager.config().trade_highlight_ms);
        let (tx, rx) = watch::channel(Vec::new());

        let task = tokio::spawn(run(sub, limit, highlight, move |feed| {
            tx.send_replace(feed);
        }));

        Self { rx, state_rx, task }
    }

    /// Current feed, newest first. Empty until the first trade arrives.
    pub fn latest(&self) -> Vec<Trade> {
        self.rx.borrow().clone()
    }

    /// Watch receiver over the view model.
    pub fn watch(&self) -> watch::Receiver<Vec<Trade>> {
        self.rx.clone()
    }

    /// Current state of the shared connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }
}

impl Drop for TradeFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F>(mut sub: ChannelSubscription, limit: usize, highlight: Duration, mut emit: F)
where
    F: FnMut(Vec<Trade>),
{
    let mut feed: Vec<Trade> = Vec::new();
    let mut next_id: u64 = 0;
    // Highlight expiries in insertion order. The interval is constant, so
    // the front entry is always the next one due.
    let mut expiries: VecDeque<(Instant, Vec<u64>)> = VecDeque::new();

    loop {
        let expire_at = expiries
            .front()
            .map(|(deadline, _)| *deadline)
            .unwrap_or_else(Instant::now);

        tokio::select! {
            payload = sub.recv() => match payload {
                Some(payload) => {
                    let incoming = extract_raw(&payload);
                    if incoming.is_empty() {
                        debug!("dropping trades frame without trade data");
                        continue;
                    }

                    let mut ids = Vec::with_capacity(incoming.len());
                    let mut fresh: Vec<Trade> = incoming
                        .into_iter()
                        .map(|raw| {
                            next_id += 1;
                            ids.push(next_id);
                            let side = resolve_side(&raw);
                            Trade {
                                id: next_id,
                                price: raw.price,
                                size: raw.size,
                                side,
                                timestamp_us: normalize_timestamp_us(
                                    raw.timestamp.unwrap_or_else(now_us),
                                ),
                                recent: true,
                            }
                        })
                        .collect();

                    // Prepend, newest first, and cap the history.
                    fresh.append(&mut feed);
                    feed = fresh;
                    feed.truncate(limit);
                    expiries.push_back((Instant::now() + highlight, ids));
                    emit(feed.clone());
                }
                None => break,
            },
            _ = time::sleep_until(expire_at), if !expiries.is_empty() => {
                if let Some((_, ids)) = expiries.pop_front() {
                    // Clear exactly this insertion's ids; later insertions
                    // keep their own expiry and are untouched.
                    let mut changed = false;
                    for trade in feed.iter_mut() {
                        if trade.recent && ids.contains(&trade.id) {
                            trade.recent = false;
                            changed = true;
                        }
                    }
                    if changed {
                        emit(feed.clone());
                    }
                }
            }
        }
    }
}

/// A frame is either a batch (`trades` array) or a single trade object.
fn extract_raw(payload: &Value) -> Vec<RawTrade> {
    if let Some(batch) = payload.get("trades").and_then(Value::as_array) {
        batch
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    } else if payload.get("price").is_some() {
        serde_json::from_value::<RawTrade>(payload.clone())
            .ok()
            .into_iter()
            .collect()
    } else {
        Vec::new()
    }
}

/// Explicit side wins; else the taker role decides; else buy.
fn resolve_side(raw: &RawTrade) -> TradeSide {
    match raw.side.as_deref() {
        Some("sell") => TradeSide::Sell,
        Some(_) => TradeSide::Buy,
        None => {
            if raw.buyer_role.as_deref() == Some("taker") {
                TradeSide::Buy
            } else if raw.seller_role.as_deref() == Some("taker") {
                TradeSide::Sell
            } else {
                TradeSide::Buy
            }
        }
    }
}

/// Normalize a second-, millisecond- or microsecond-resolution timestamp to
/// canonical microseconds by magnitude. Zero stays zero.
fn normalize_timestamp_us(mut ts: u64) -> u64 {
    while ts != 0 && ts < MICROS_THRESHOLD {
        ts = ts.saturating_mul(1000);
    }
    ts
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
