//! Orderbook levels, raw and shaped.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// One price level exactly as it appears on the wire.
///
/// Depth frames name the price field `limit_price`, the REST book uses
/// `price`; both spellings land here. Values that fail to parse compare as
/// zero, mirroring how the feed treats absent levels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawLevel {
    /// Price as a decimal string, exact precision preserved.
    #[serde(alias = "limit_price", deserialize_with = "crate::de::string_or_number")]
    pub price: String,
    /// Size at this price as a decimal string.
    #[serde(deserialize_with = "crate::de::string_or_number")]
    pub size: String,
}

impl RawLevel {
    /// Numeric price for ordering. Unparseable prices sort as zero.
    pub fn price_decimal(&self) -> Decimal {
        Decimal::from_str(&self.price).unwrap_or(Decimal::ZERO)
    }

    /// Numeric size for cumulative sums. Unparseable sizes count as zero.
    pub fn size_decimal(&self) -> Decimal {
        Decimal::from_str(&self.size).unwrap_or(Decimal::ZERO)
    }
}

/// One shaped depth level: the raw strings plus cumulative size and the
/// level's share of the visible slice, ready for a depth bar.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLevel {
    /// Original price string from the wire.
    pub price: String,
    /// Original size string from the wire.
    pub size: String,
    /// Running size sum from the best price down to this level.
    pub cumulative: Decimal,
    /// `cumulative ÷ slice total`, in `[0, 1]`; zero when the slice total is
    /// zero.
    pub depth_share: f64,
}

/// Display-ready orderbook for one symbol.
///
/// Bids sorted best (highest) first, asks best (lowest) first, both capped
/// at the configured depth. `spread` and `spread_percent` are zero whenever
/// either side is empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderbookSnapshot {
    /// Bid levels, highest price first.
    pub bids: Vec<DepthLevel>,
    /// Ask levels, lowest price first.
    pub asks: Vec<DepthLevel>,
    /// Best ask minus best bid.
    pub spread: Decimal,
    /// Spread as a percentage of the best ask.
    pub spread_percent: Decimal,
}

impl OrderbookSnapshot {
    /// Best bid level, if any.
    pub fn best_bid(&self) -> Option<&DepthLevel> {
        self.bids.first()
    }

    /// Best ask level, if any.
    pub fn best_ask(&self) -> Option<&DepthLevel> {
        self.asks.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_raw_level_field_aliases() {
        let level: RawLevel = serde_json::from_str(r#"{"limit_price":"101.5","size":"3"}"#).unwrap();
        assert_eq!(level.price, "101.5");

        let level: RawLevel = serde_json::from_str(r#"{"price":101.5,"size":3}"#).unwrap();
        assert_eq!(level.price, "101.5");
        assert_eq!(level.size, "3");
    }

    #[test]
    fn test_unparseable_values_compare_as_zero() {
        let level = RawLevel {
            price: "not-a-price".to_string(),
            size: "".to_string(),
        };
        assert_eq!(level.price_decimal(), Decimal::ZERO);
        assert_eq!(level.size_decimal(), Decimal::ZERO);

        let level = RawLevel {
            price: "100.25".to_string(),
            size: "0.5".to_string(),
        };
        assert_eq!(level.price_decimal(), dec!(100.25));
        assert_eq!(level.size_decimal(), dec!(0.5));
    }
}
