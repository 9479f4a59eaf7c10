//! Ticker pass-through processor.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use types::{Channel, ConnectionState, Ticker};

use crate::connection::ConnectionManager;
use crate::subscription::ChannelSubscription;

/// Live ticker view model for one symbol.
///
/// Stateless pass-through: every inbound frame fully replaces the cached
/// snapshot. No smoothing, no history.
pub struct TickerFeed {
    rx: watch::Receiver<Option<Ticker>>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl TickerFeed {
    /// Subscribe `symbol`'s ticker channel and start the processor.
    pub fn new(manager: &ConnectionManager, symbol: &str) -> Self {
        let sub = manager.subscribe(Channel::Ticker, symbol);
        let state_rx = sub.state_watch();
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(run(sub, tx));

        Self { rx, state_rx, task }
    }

    /// Latest ticker snapshot, `None` until the first frame arrives.
    pub fn latest(&self) -> Option<Ticker> {
        self.rx.borrow().clone()
    }

    /// Watch receiver over the view model.
    pub fn watch(&self) -> watch::Receiver<Option<Ticker>> {
        self.rx.clone()
    }

    /// Current state of the shared connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }
}

impl Drop for TickerFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(mut sub: ChannelSubscription, tx: watch::Sender<Option<Ticker>>) {
    while let Some(payload) = sub.recv().await {
        match serde_json::from_value::<Ticker>((*payload).clone()) {
            Ok(ticker) => {
                tx.send_replace(Some(ticker));
            }
            Err(e) => debug!(error = %e, "dropping unparseable ticker frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Command;
    use crate::subscription::SubscriptionGuard;
    use std::sync::Arc;
    use tokio::sync::mpsc::unbounded_channel;
    use types::SubscriptionKey;

    fn test_subscription() -> (
        tokio::sync::mpsc::UnboundedSender<crate::registry::Payload>,
        ChannelSubscription,
    ) {
        let (payload_tx, payload_rx) = unbounded_channel();
        let (cmd_tx, _cmd_rx) = unbounded_channel::<Command>();
        let (_state_tx, state_rx) = tokio::sync::watch::channel(ConnectionState::Connected);
        let guard = SubscriptionGuard::new(
            cmd_tx,
            SubscriptionKey::new(Channel::Ticker, "BTCUSD"),
            1,
        );
        (
            payload_tx,
            ChannelSubscription::new(payload_rx, state_rx, guard),
        )
    }

    #[tokio::test]
    async fn test_each_frame_fully_replaces_the_snapshot() {
        let (payload_tx, sub) = test_subscription();
        let (tx, mut rx) = watch::channel(None);
        let task = tokio::spawn(run(sub, tx));

        let frame = |close: &str, oi: Option<&str>| {
            let mut v = serde_json::json!({
                "type": "v2/ticker",
                "symbol": "BTCUSD",
                "close": close,
                "open": "100", "high": "120", "low": "90",
                "mark_price": "110", "volume": "5000",
            });
            if let Some(oi) = oi {
                v["oi"] = serde_json::Value::String(oi.to_string());
            }
            Arc::new(v)
        };

        payload_tx.send(frame("110", Some("42"))).unwrap();
        rx.changed().await.unwrap();
        let first = rx.borrow().clone().unwrap();
        assert_eq!(first.close, "110");
        assert_eq!(first.oi.as_deref(), Some("42"));

        // The second frame omits `oi`; a replace (not a merge) must lose it.
        payload_tx.send(frame("111", None)).unwrap();
        rx.changed().await.unwrap();
        let second = rx.borrow().clone().unwrap();
        assert_eq!(second.close, "111");
        assert_eq!(second.oi, None);

        task.abort();
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let (payload_tx, sub) = test_subscription();
        let (tx, mut rx) = watch::channel(None);
        let task = tokio::spawn(run(sub, tx));

        payload_tx
            .send(Arc::new(serde_json::json!({"type": "v2/ticker", "symbol": "BTCUSD"})))
            .unwrap();
        tokio::task::yield_now().await;
        assert!(!rx.has_changed().unwrap());
        assert!(rx.borrow().is_none());

        task.abort();
    }
}
