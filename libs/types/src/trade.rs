//! Trade records for the bounded live feed.

use std::fmt;

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    /// Taker bought.
    Buy,
    /// Taker sold.
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        })
    }
}

/// One normalized trade in the live feed.
///
/// `id` is a synthetic, monotonically increasing identity assigned at
/// ingestion — it keys list rows and highlight expiry, it is not the
/// exchange's trade id. `recent` is a transient flag set on insertion and
/// cleared a fixed interval later.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Synthetic feed-local identity.
    pub id: u64,
    /// Price as a decimal string.
    pub price: String,
    /// Size as a decimal string.
    pub size: String,
    /// Aggressor side.
    pub side: TradeSide,
    /// Canonical timestamp in microseconds since epoch.
    pub timestamp_us: u64,
    /// True until the highlight interval after insertion has elapsed.
    pub recent: bool,
}
