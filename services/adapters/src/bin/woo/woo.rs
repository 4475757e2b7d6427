//! # Woo Stream Collector
//!
//! Connects to the Woo WebSocket API, subscribes the configured channels for
//! every configured market and logs the normalized events until Ctrl+C.
//!
//! ## Configuration
//! - First argument: path to a TOML file (see `config/woo.toml`)
//! - Without one, defaults plus `WOO_*` environment variables are used
//! - `RUST_LOG` controls verbosity (default `adapter_service=debug,woo=info`)

use adapter_service::{
    Channel, ChannelSink, ClientEvent, StreamingClient, WooClient, WooConfig,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use types::{Market, VenueId};

fn load_config() -> Result<WooConfig> {
    let config = match std::env::args().nth(1) {
        Some(path) => WooConfig::from_toml_with_env_overrides(&path)
            .with_context(|| format!("Failed to load {}", path))?,
        None => {
            info!("No config file given, using environment");
            WooConfig::from_env()
        }
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn parse_markets(config: &WooConfig) -> Result<Vec<Market>> {
    config
        .markets
        .iter()
        .map(|symbol| {
            Market::from_symbol(VenueId::Woo, symbol)
                .with_context(|| format!("Invalid market {}", symbol))
        })
        .collect()
}

async fn subscribe_all(client: WooClient, channels: Vec<Channel>, markets: Vec<Market>) {
    for channel in channels {
        for market in &markets {
            if let Err(e) = client.subscribe(channel, market).await {
                warn!("Subscribe {} {} failed: {}", channel, market, e);
            }
        }
    }
    info!("Subscriptions sent: {} entries registered", client.registry().snapshot().len());
}

fn log_event(event: &ClientEvent) {
    match event {
        ClientEvent::Ticker(ticker, market) => {
            debug!("ticker {} last={} vol={}", market.pair(), ticker.last, ticker.volume)
        }
        ClientEvent::Trade(trade, market) => {
            info!("trade {} {} {} @ {}", market.pair(), trade.side, trade.amount, trade.price)
        }
        ClientEvent::Candle(candle, market) => {
            debug!("candle {} {} c={}", market.pair(), candle.timestamp_ms, candle.close)
        }
        ClientEvent::Level2Update(update, market) => debug!(
            "l2update {} seq={} asks={} bids={}",
            market.pair(),
            update.sequence_id,
            update.asks.len(),
            update.bids.len()
        ),
        ClientEvent::Level2Snapshot(snapshot, market) => debug!(
            "l2snapshot {} asks={} bids={}",
            market.pair(),
            snapshot.asks.len(),
            snapshot.bids.len()
        ),
        ClientEvent::Bbo(bbo, market) => {
            debug!("bbo {} {} / {}", market.pair(), bbo.bid.price, bbo.ask.price)
        }
        ClientEvent::Orders(report) => info!("order {:?}", report),
        ClientEvent::Error(e) => error!("{}", e),
        other => info!("{}", other.name()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("adapter_service=debug,woo=info")),
        )
        .init();

    let config = load_config()?;
    let markets = parse_markets(&config)?;
    let channels: Vec<Channel> = config
        .channels
        .iter()
        .copied()
        .filter(|channel| {
            let usable = !channel.is_private() || config.credentials.is_some();
            if !usable {
                warn!("Skipping {} channel: no credentials configured", channel);
            }
            usable
        })
        .collect();

    info!("Woo collector starting");
    info!("   Stream: {}", config.stream_url());
    info!("   Markets: {:?}", config.markets);
    info!("   Channels: {:?}", channels);

    let (sink, mut events) = ChannelSink::new();
    let client = WooClient::new(&config, Arc::new(sink)).context("Failed to build client")?;
    client.connect().await.context("Failed to start transport")?;

    let mut subscribed = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                log_event(&event);

                if matches!(event, ClientEvent::Connected) && !subscribed {
                    subscribed = true;
                    tokio::spawn(subscribe_all(client.clone(), channels.clone(), markets.clone()));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    client.close().await.context("Failed to close client")?;
    info!("Woo collector stopped");
    Ok(())
}
