//! Per-consumer channel subscriptions.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use types::{ConnectionState, SubscriptionKey};

use crate::connection::Command;
use crate::registry::{Payload, SubscriberId};

/// A live subscription to one `(channel, symbol)` stream.
///
/// Holds the listener's receiving end plus a guard that releases the
/// registry entry on drop — detaching can therefore never be forgotten,
/// and the last listener leaving a key triggers the wire unsubscribe in
/// the same actor turn. The receiver is the consumer's stable attachment
/// point: recreating closures around it never touches the registry.
pub struct ChannelSubscription {
    rx: UnboundedReceiver<Payload>,
    state_rx: watch::Receiver<ConnectionState>,
    _guard: SubscriptionGuard,
}

impl ChannelSubscription {
    pub(crate) fn new(
        rx: UnboundedReceiver<Payload>,
        state_rx: watch::Receiver<ConnectionState>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self {
            rx,
            state_rx,
            _guard: guard,
        }
    }

    /// Next raw payload for this key. `None` once the connection actor is
    /// gone.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Current state of the shared connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver for connection state changes, for consumers that
    /// want to observe transitions alongside the data stream.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

/// Deregistration handle. Dropping it sends the unsubscribe command for
/// exactly this listener.
pub(crate) struct SubscriptionGuard {
    cmd_tx: UnboundedSender<Command>,
    key: SubscriptionKey,
    id: SubscriberId,
}

impl SubscriptionGuard {
    pub(crate) fn new(
        cmd_tx: UnboundedSender<Command>,
        key: SubscriptionKey,
        id: SubscriberId,
    ) -> Self {
        Self { cmd_tx, key, id }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(Command::Unsubscribe {
            key: self.key.clone(),
            id: self.id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use types::Channel;

    #[tokio::test]
    async fn test_guard_drop_sends_unsubscribe() {
        let (cmd_tx, mut cmd_rx) = unbounded_channel();
        let key = SubscriptionKey::new(Channel::Trades, "BTCUSD");

        let guard = SubscriptionGuard::new(cmd_tx, key.clone(), 7);
        drop(guard);

        match cmd_rx.recv().await {
            Some(Command::Unsubscribe { key: k, id }) => {
                assert_eq!(k, key);
                assert_eq!(id, 7);
            }
            _ => panic!("expected unsubscribe command"),
        }
    }
}
