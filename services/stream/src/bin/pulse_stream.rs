//! Pulse stream demo service.
//!
//! Connects the shared multiplexer, loads the catalog for an initial paint,
//! subscribes all three channels for one symbol and logs view model
//! updates until Ctrl-C.

use anyhow::{anyhow, Context, Result};
use stream_service::{
    ConnectionManager, FavoritesStore, OrderbookFeed, RestClient, StreamConfig, TickerFeed,
    TradeFeed,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StreamConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!(e))
        .context("invalid configuration")?;

    let symbol = std::env::var("PULSE_SYMBOL").unwrap_or_else(|_| "BTCUSD".to_string());

    let favorites_path =
        std::env::var("PULSE_FAVORITES_PATH").unwrap_or_else(|_| "favorites.json".to_string());
    let favorites = FavoritesStore::load(favorites_path);
    info!(
        count = favorites.symbols().len(),
        favorite = favorites.contains(&symbol),
        "favorites loaded"
    );

    // Initial paint from REST before the stream takes over. Recoverable:
    // the stream works without it.
    let rest = RestClient::new(&config)?;
    match rest.load_catalog().await {
        Ok(catalog) => info!(products = catalog.len(), "catalog loaded"),
        Err(e) => warn!(error = %e, "catalog load failed, continuing with stream only"),
    }

    let manager = ConnectionManager::new(config);
    manager.connect();

    let ticker = TickerFeed::new(&manager, &symbol);
    let orderbook = OrderbookFeed::new(&manager, &symbol);
    let trades = TradeFeed::new(&manager, &symbol);

    let mut state_rx = manager.state_watch();
    let mut ticker_rx = ticker.watch();
    let mut orderbook_rx = orderbook.watch();
    let mut trades_rx = trades.watch();

    info!(%symbol, "streaming, Ctrl-C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = state_rx.changed() => {
                info!(state = %*state_rx.borrow(), "connection state");
            }
            Ok(()) = ticker_rx.changed() => {
                if let Some(ticker) = ticker_rx.borrow().as_ref() {
                    info!(close = %ticker.close, mark = %ticker.mark_price, "ticker");
                }
            }
            Ok(()) = orderbook_rx.changed() => {
                if let Some(book) = orderbook_rx.borrow().as_ref() {
                    info!(
                        spread = %book.spread,
                        spread_pct = %book.spread_percent,
                        bids = book.bids.len(),
                        asks = book.asks.len(),
                        "orderbook"
                    );
                }
            }
            Ok(()) = trades_rx.changed() => {
                if let Some(last) = trades_rx.borrow().first() {
                    info!(price = %last.price, size = %last.size, side = %last.side, "trade");
                }
            }
        }
    }

    info!("shutting down");
    manager.disconnect();
    Ok(())
}
