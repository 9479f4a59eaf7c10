//! # Pulse Unified Types Library
//!
//! Shared market data model for the Pulse terminal: channel identities,
//! connection lifecycle states, ticker snapshots, shaped orderbooks, trade
//! records and the REST catalog types.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: prices and sizes stay the exchange's decimal
//!   strings end to end; numeric work (sorting, sums, spreads) goes through
//!   [`rust_decimal::Decimal`], never floating point.
//! - **Value-Typed Keys**: routing identity is the [`SubscriptionKey`]
//!   struct, not a concatenated string.
//! - **No I/O**: this crate is pure data. Connection handling, shaping and
//!   persistence live in `stream-service`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod orderbook;
pub mod product;
pub mod ticker;
pub mod trade;

pub mod de;

pub use channel::{Channel, ConnectionState, SubscriptionKey};
pub use orderbook::{DepthLevel, OrderbookSnapshot, RawLevel};
pub use product::{ApiDetailResponse, ApiListResponse, Asset, Product, ProductSummary};
pub use ticker::Ticker;
pub use trade::{Trade, TradeSide};
