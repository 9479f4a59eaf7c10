//! Per-channel stream processors.
//!
//! Each processor owns one [`ChannelSubscription`](crate::ChannelSubscription),
//! runs its shaping loop in its own task, and publishes the latest view
//! model through a `watch` channel. Dropping the feed handle aborts the
//! task, which drops the subscription guard — detaching a consumer cancels
//! its pending timers and releases its registry reference in one stroke.

pub mod orderbook;
pub mod ticker;
pub mod trades;

pub use orderbook::OrderbookFeed;
pub use ticker::TickerFeed;
pub use trades::TradeFeed;
