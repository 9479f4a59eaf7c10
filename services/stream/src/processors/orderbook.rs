//! Orderbook depth aggregation with emission throttling.
//!
//! Raw depth frames arrive unordered and at whatever rate the market
//! trades. This processor sorts both sides numerically, cuts them to the
//! configured depth, annotates cumulative sizes and depth shares, derives
//! the spread — and throttles emission so a burst of updates costs one
//! immediate snapshot plus one flush per window instead of a render per
//! frame. The flush reflects only the latest raw state; intermediate frames
//! are dropped, not queued.

use std::cmp::Reverse;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;
use types::{Channel, ConnectionState, DepthLevel, OrderbookSnapshot, RawLevel};

use crate::connection::ConnectionManager;
use crate::subscription::ChannelSubscription;

/// Raw depth frame: unordered bid/ask level arrays.
#[derive(Debug, Default, Deserialize)]
struct OrderbookMessage {
    #[serde(default)]
    buy: Vec<RawLevel>,
    #[serde(default)]
    sell: Vec<RawLevel>,
}

/// Live shaped orderbook for one symbol.
pub struct OrderbookFeed {
    rx: watch::Receiver<Option<OrderbookSnapshot>>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl OrderbookFeed {
    /// Subscribe `symbol`'s depth channel and start the processor.
    pub fn new(manager: &ConnectionManager, symbol: &str) -> Self {
        let sub = manager.subscribe(Channel::Orderbook, symbol);
        let state_rx = sub.state_watch();
        let depth = manager.config().orderbook_depth;
        let window = Duration::from_millis(manager.config().orderbook_throttle_ms);
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(run(sub, depth, window, move |snapshot| {
            tx.send_replace(Some(snapshot));
        }));

        Self { rx, state_rx, task }
    }

    /// Latest shaped snapshot, `None` until the first frame arrives.
    pub fn latest(&self) -> Option<OrderbookSnapshot> {
        self.rx.borrow().clone()
    }

    /// Watch receiver over the view model.
    pub fn watch(&self) -> watch::Receiver<Option<OrderbookSnapshot>> {
        self.rx.clone()
    }

    /// Current state of the shared connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }
}

impl Drop for OrderbookFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<F>(mut sub: ChannelSubscription, depth: usize, window: Duration, mut emit: F)
where
    F: FnMut(OrderbookSnapshot),
{
    let mut pending: Option<OrderbookMessage> = None;
    let mut window_end: Option<Instant> = None;

    loop {
        let flush_at = window_end.unwrap_or_else(Instant::now);

        tokio::select! {
            payload = sub.recv() => match payload {
                Some(payload) => {
                    let book = match serde_json::from_value::<OrderbookMessage>((*payload).clone()) {
                        Ok(book) => book,
                        Err(e) => {
                            debug!(error = %e, "dropping unparseable orderbook frame");
                            continue;
                        }
                    };
                    if window_end.is_none() {
                        // First frame of a window: emit immediately, open
                        // the window.
                        emit(shape(&book, depth));
                        window_end = Some(Instant::now() + window);
                    } else {
                        // Inside the window only the latest raw state is
                        // retained.
                        pending = Some(book);
                    }
                }
                None => break,
            },
            _ = time::sleep_until(flush_at), if window_end.is_some() => {
                // Window over: flush whatever arrived during it. The flush
                // does not open a new window, so a quiet book emits again
                // as soon as the next frame lands.
                window_end = None;
                if let Some(book) = pending.take() {
                    emit(shape(&book, depth));
                }
            }
        }
    }
}

/// Shape one raw frame into a display-ready snapshot.
fn shape(book: &OrderbookMessage, depth: usize) -> OrderbookSnapshot {
    // Numeric sort on Decimal keys; the emitted price stays the original
    // string. Index 0 = best price on both sides.
    let mut raw_bids: Vec<&RawLevel> = book.buy.iter().collect();
    raw_bids.sort_by_cached_key(|level| Reverse(level.price_decimal()));
    let mut raw_asks: Vec<&RawLevel> = book.sell.iter().collect();
    raw_asks.sort_by_cached_key(|level| level.price_decimal());

    raw_bids.truncate(depth);
    raw_asks.truncate(depth);

    let best_bid = raw_bids
        .first()
        .map(|level| level.price_decimal())
        .unwrap_or(Decimal::ZERO);
    let best_ask = raw_asks
        .first()
        .map(|level| level.price_decimal())
        .unwrap_or(Decimal::ZERO);

    let spread = if best_bid > Decimal::ZERO && best_ask > Decimal::ZERO {
        best_ask - best_bid
    } else {
        Decimal::ZERO
    };
    let spread_percent = if best_ask > Decimal::ZERO {
        spread / best_ask * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    OrderbookSnapshot {
        bids: shape_side(&raw_bids),
        asks: shape_side(&raw_asks),
        spread,
        spread_percent,
    }
}

/// Cumulative sizes outward from the best price, then each level's share of
/// the slice total. All shares zero when the slice total is zero.
fn shape_side(levels: &[&RawLevel]) -> Vec<DepthLevel> {
    let mut cumulative = Decimal::ZERO;
    let mut shaped: Vec<DepthLevel> = levels
        .iter()
        .map(|level| {
            cumulative += level.size_decimal();
            DepthLevel {
                price: level.price.clone(),
                size: level.size.clone(),
                cumulative,
                depth_share: 0.0,
            }
        })
        .collect();

    let total = cumulative;
    if total > Decimal::ZERO {
        for level in &mut shaped {
            level.depth_share = (level.cumulative / total).to_f64().unwrap_or(0.0);
        }
    }
    shaped
}
