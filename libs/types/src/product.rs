//! REST catalog types.

use crate::ticker::Ticker;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Success-wrapped list envelope returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiListResponse<T> {
    /// The listed items.
    pub result: Vec<T>,
    /// False when the API rejected the request despite HTTP 200.
    pub success: bool,
}

/// Success-wrapped single-item envelope returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiDetailResponse<T> {
    /// The item.
    pub result: T,
    /// False when the API rejected the request despite HTTP 200.
    pub success: bool,
}

/// An asset referenced by a product (quoting, settling or underlying).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    /// Numeric asset id.
    pub id: u64,
    /// Asset symbol, e.g. `USDT`.
    pub symbol: String,
    /// Display precision in decimal places.
    #[serde(default)]
    pub precision: u32,
}

/// One tradable product from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    /// Numeric product id.
    pub id: u64,
    /// Instrument symbol, e.g. `BTCUSD`.
    pub symbol: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Contract class, e.g. `perpetual_futures`.
    #[serde(default)]
    pub contract_type: String,
    /// Asset the contract is quoted in.
    #[serde(default)]
    pub quoting_asset: Option<Asset>,
    /// Asset the contract settles in.
    #[serde(default)]
    pub settling_asset: Option<Asset>,
    /// Underlying asset, absent for some contract classes.
    #[serde(default)]
    pub underlying_asset: Option<Asset>,
}

impl Product {
    /// True for perpetual futures, the contract class the terminal lists.
    pub fn is_perpetual(&self) -> bool {
        self.contract_type == "perpetual_futures"
    }
}

/// A catalog product joined with its initial ticker snapshot.
///
/// `ticker` is `None` when the per-symbol snapshot fetch failed — the
/// product still lists, its price cells just show as unavailable.
#[derive(Debug, Clone)]
pub struct ProductSummary {
    /// The catalog entry.
    pub product: Product,
    /// Initial ticker snapshot, if the fetch succeeded.
    pub ticker: Option<Ticker>,
    /// Derived 24h change percent, when the snapshot allows it.
    pub change_percent: Option<Decimal>,
}
