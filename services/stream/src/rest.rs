//! REST catalog client.
//!
//! The stream only carries deltas; the first paint of the list screen comes
//! from REST — the product catalog plus one ticker snapshot per symbol.
//! Catalog failures are recoverable errors the caller can retry; a single
//! snapshot failing must never sink the whole load.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use tracing::warn;
use types::{ApiDetailResponse, ApiListResponse, Product, ProductSummary, Ticker};

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};

/// HTTP client for the exchange's public REST API.
pub struct RestClient {
    http: Client,
    base_url: String,
}

impl RestClient {
    /// Build a client against the configured REST base URL.
    pub fn new(config: &StreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full product catalog.
    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let endpoint = "/v2/products".to_string();
        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StreamError::Api {
                message: format!("HTTP {}", response.status()),
                endpoint,
            });
        }

        let body: ApiListResponse<Product> = response.json().await?;
        if !body.success {
            return Err(StreamError::Api {
                message: "API returned an unsuccessful response".to_string(),
                endpoint,
            });
        }
        Ok(body.result)
    }

    /// Fetch the ticker snapshot for one symbol.
    pub async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let endpoint = format!("/v2/tickers/{symbol}");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StreamError::Api {
                message: format!("HTTP {}", response.status()),
                endpoint,
            });
        }

        let body: ApiDetailResponse<Ticker> = response.json().await?;
        if !body.success {
            return Err(StreamError::Api {
                message: "API returned an unsuccessful response".to_string(),
                endpoint,
            });
        }
        Ok(body.result)
    }

    /// Load the list screen's catalog: perpetual futures joined with their
    /// initial ticker snapshots.
    ///
    /// Snapshot fetches run concurrently, and an individual failure resolves
    /// that product's ticker to "unavailable" instead of failing the load.
    pub async fn load_catalog(&self) -> Result<Vec<ProductSummary>> {
        let products: Vec<Product> = self
            .fetch_products()
            .await?
            .into_iter()
            .filter(Product::is_perpetual)
            .collect();

        let snapshots = join_all(products.iter().map(|p| self.fetch_ticker(&p.symbol))).await;

        Ok(products
            .into_iter()
            .zip(snapshots)
            .map(|(product, snapshot)| {
                let ticker = match snapshot {
                    Ok(ticker) => Some(ticker),
                    Err(e) => {
                        warn!(symbol = %product.symbol, error = %e, "ticker snapshot unavailable");
                        None
                    }
                };
                let change_percent = ticker.as_ref().and_then(Ticker::change_percent);
                ProductSummary {
                    product,
                    ticker,
                    change_percent,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn config(base_url: &str) -> StreamConfig {
        StreamConfig {
            rest_url: base_url.to_string(),
            ..StreamConfig::default()
        }
    }

    fn products_body() -> String {
        json!({
            "success": true,
            "result": [
                {"id": 27, "symbol": "BTCUSD", "description": "Bitcoin Perpetual",
                 "contract_type": "perpetual_futures"},
                {"id": 28, "symbol": "ETHUSD", "description": "Ether Perpetual",
                 "contract_type": "perpetual_futures"},
                {"id": 99, "symbol": "BTC-31JAN", "description": "Bitcoin Future",
                 "contract_type": "futures"}
            ]
        })
        .to_string()
    }

    fn ticker_body(symbol: &str, close: &str, open: &str) -> String {
        json!({
            "success": true,
            "result": {
                "symbol": symbol, "close": close, "open": open,
                "high": close, "low": open, "mark_price": close,
                "volume": "1000", "product_id": 27, "timestamp": 1_700_000_000_000_000u64
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_load_catalog_tolerates_partial_failure() {
        let mut server = mockito::Server::new_async().await;
        let _products = server
            .mock("GET", "/v2/products")
            .with_body(products_body())
            .create_async()
            .await;
        let _btc = server
            .mock("GET", "/v2/tickers/BTCUSD")
            .with_body(ticker_body("BTCUSD", "110", "100"))
            .create_async()
            .await;
        let _eth = server
            .mock("GET", "/v2/tickers/ETHUSD")
            .with_status(502)
            .create_async()
            .await;

        let client = RestClient::new(&config(&server.url())).unwrap();
        let catalog = client.load_catalog().await.unwrap();

        // Non-perpetuals are filtered out.
        assert_eq!(catalog.len(), 2);

        let btc = &catalog[0];
        assert_eq!(btc.product.symbol, "BTCUSD");
        assert_eq!(btc.ticker.as_ref().unwrap().close, "110");
        assert_eq!(btc.change_percent, Some(dec!(10)));

        // The failed snapshot resolves to unavailable, not an error.
        let eth = &catalog[1];
        assert_eq!(eth.product.symbol, "ETHUSD");
        assert!(eth.ticker.is_none());
        assert!(eth.change_percent.is_none());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_recoverable() {
        let mut server = mockito::Server::new_async().await;
        let _products = server
            .mock("GET", "/v2/products")
            .with_status(500)
            .create_async()
            .await;

        let client = RestClient::new(&config(&server.url())).unwrap();
        let err = client.load_catalog().await.unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("/v2/products"));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _products = server
            .mock("GET", "/v2/products")
            .with_body(json!({"success": false, "result": []}).to_string())
            .create_async()
            .await;

        let client = RestClient::new(&config(&server.url())).unwrap();
        assert!(matches!(
            client.fetch_products().await,
            Err(StreamError::Api { .. })
        ));
    }
}
