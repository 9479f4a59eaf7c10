//! Ticker snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Latest price/volume/funding snapshot for one symbol.
///
/// Arrives both from the REST snapshot endpoint and the `v2/ticker` stream;
/// each update fully replaces the previous snapshot, there is no merging.
/// Price-like fields stay decimal strings exactly as the exchange sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// Instrument symbol.
    pub symbol: String,
    /// Last traded price.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub close: String,
    /// Price 24h ago.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub open: String,
    /// 24h high.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub high: String,
    /// 24h low.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub low: String,
    /// Fair price used for margining.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub mark_price: String,
    /// 24h contract volume.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub volume: String,
    /// 24h notional turnover in USD.
    #[serde(default, deserialize_with = "crate::de::opt_string_or_number")]
    pub turnover_usd: Option<String>,
    /// Numeric product id on the exchange.
    #[serde(default)]
    pub product_id: u64,
    /// Exchange timestamp of the snapshot (microseconds since epoch).
    #[serde(default)]
    pub timestamp: u64,
    /// Current funding rate, perpetuals only.
    #[serde(default, deserialize_with = "crate::de::opt_string_or_number")]
    pub funding_rate: Option<String>,
    /// Open interest, perpetuals only.
    #[serde(default, deserialize_with = "crate::de::opt_string_or_number")]
    pub oi: Option<String>,
}

impl Ticker {
    /// 24h change in percent, `(close − open) / open × 100`.
    ///
    /// `None` when either field does not parse or `open` is zero.
    pub fn change_percent(&self) -> Option<Decimal> {
        let close = Decimal::from_str(&self.close).ok()?;
        let open = Decimal::from_str(&self.open).ok()?;
        if open.is_zero() {
            return None;
        }
        Some((close - open) / open * Decimal::ONE_HUNDRED)
    }
}
