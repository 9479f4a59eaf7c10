//! # Pulse Stream Service - Shared-Connection Market Data Multiplexer
//!
//! ## Purpose
//!
//! Maintains one WebSocket connection to the exchange feed and multiplexes
//! it across any number of consumers. Raw high-frequency frames are shaped
//! into stable, display-ready view models per channel: ticker pass-through,
//! depth-aggregated orderbooks with emission throttling, and a bounded
//! trade feed with transient highlighting.
//!
//! ## Architecture Role
//!
//! ```text
//! Exchange Feed ──→ [ConnectionManager actor] ──→ SubscriptionRegistry
//!      wss://            state machine               ref-counted routing
//!                        heartbeat/backoff                  │
//!                                                           ▼
//!                               TickerFeed · OrderbookFeed · TradeFeed
//!                                           view models (watch channels)
//! ```
//!
//! Data flows one way: wire frames through the actor and registry into the
//! processors. Control flows the other way: consumers attach and detach
//! subscriptions, which ref-count into wire subscribe/unsubscribe traffic.
//!
//! ## Key Properties
//!
//! - **One socket, many consumers**: wire subscribe/unsubscribe fire only
//!   on a key's first attach and last detach.
//! - **Single event loop**: all registry mutation, routing and state
//!   transitions run inside one actor task — no locks anywhere.
//! - **Self-healing**: exponential backoff reconnection (1s doubling to a
//!   30s cap) with full subscription replay on every reconnect.
//! - **Quiet failure**: transport errors fold into connection states;
//!   malformed frames drop silently; nothing here is fatal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod favorites;
pub mod messages;
pub mod processors;
pub mod registry;
pub mod rest;
pub mod subscription;

pub use config::StreamConfig;
pub use connection::ConnectionManager;
pub use error::{Result, StreamError};
pub use favorites::FavoritesStore;
pub use processors::{OrderbookFeed, TickerFeed, TradeFeed};
pub use rest::RestClient;
pub use subscription::ChannelSubscription;

// Re-export the model types consumers see in view models.
pub use types::{
    Channel, ConnectionState, DepthLevel, OrderbookSnapshot, ProductSummary, SubscriptionKey,
    Ticker, Trade, TradeSide,
};
