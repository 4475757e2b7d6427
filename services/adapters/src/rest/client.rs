//! Woo REST collaborator
//!
//! Public endpoints go out unsigned. Private endpoints carry the API key, a
//! millisecond timestamp and an HMAC over the sorted, url-encoded parameters.
//! Every request waits on the shared pacer first.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use types::{CandlePeriod, VenueId, SPOT_PREFIX};

use super::models::{
    AccountTrade, Balance, CancelResult, ClientInfoResponse, Currency, HoldingResponse,
    InstrumentInfo, KlineRow, MarketInfo, Ohlcv, Order, OrderBook, OrderBookResponse,
    OrderRequest, OrderResponse, OrderType, Rows, TokenNetwork, TradeRow, TradingFees,
};
use super::signer::Signer;
use crate::config::WooConfig;
use crate::rate_limit::RequestPacer;
use crate::{AdapterError, Result};

/// Query parameters; `None` values are skipped
pub type Params = Vec<(&'static str, Option<String>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Private,
}

/// Venue-prefixed form of a market id (`BTC_USDT` -> `SPOT_BTC_USDT`)
pub fn venue_symbol(symbol: &str) -> String {
    if symbol.starts_with(SPOT_PREFIX) {
        symbol.to_string()
    } else {
        format!("{}{}", SPOT_PREFIX, symbol)
    }
}

/// Sorted, url-encoded query string with empty values dropped
///
/// The same string is sent on the wire and signed.
pub fn normalize(params: &Params) -> String {
    let mut present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
        .collect();
    present.sort_by(|a, b| a.0.cmp(b.0));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in present {
        if k == "symbol" {
            serializer.append_pair(k, &venue_symbol(v));
        } else {
            serializer.append_pair(k, v);
        }
    }
    serializer.finish()
}

/// REST client for the Woo v1/v2 HTTP API
#[derive(Debug, Clone)]
pub struct WooRestClient {
    venue: VenueId,
    http: reqwest::Client,
    base_url: String,
    signer: Option<Signer>,
    pacer: RequestPacer,
}

impl WooRestClient {
    pub fn new(config: &WooConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(config.connect_timeout().max(Duration::from_secs(10)))
            .tcp_nodelay(true)
            .build()?;

        let mut base_url = config.rest_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            venue: VenueId::Woo,
            http,
            base_url,
            signer: config.credentials.as_ref().map(Signer::from_credentials),
            pacer: RequestPacer::new(config.rest_throttle()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Params,
        access: Access,
    ) -> Result<T> {
        let query = normalize(&params);
        let url = if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        };

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header("cache-control", "no-cache");

        if access == Access::Private {
            let signer = self
                .signer
                .as_ref()
                .ok_or(AdapterError::MissingCredentials { venue: self.venue })?;
            let timestamp = chrono::Utc::now().timestamp_millis().max(0) as u64;
            let signature = signer.sign_request(&query, timestamp)?;
            builder = builder
                .header("x-api-key", signer.api_key())
                .header("x-api-signature", signature)
                .header("x-api-timestamp", timestamp.to_string())
                .header("Content-Type", "application/x-www-form-urlencoded");
        }

        self.pacer.wait().await;
        tracing::debug!("{} {}", method, path);

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited on {} {}", method, path);
            return Err(AdapterError::RateLimitExceeded { venue: self.venue });
        }

        let value: Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(self.classify(status, path, body)),
            Err(e) => return Err(e.into()),
        };

        if !status.is_success() || value.get("success").and_then(Value::as_bool) == Some(false) {
            tracing::warn!("{} {} failed with {}: {}", method, path, status, body);
            return Err(self.classify(status, path, body));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Typed error for a failed response, falling back to `RestApi`
    fn classify(&self, status: StatusCode, path: &str, body: String) -> AdapterError {
        if status.as_u16() == 520 {
            return AdapterError::ExchangeUnavailable {
                venue: self.venue,
                status: status.as_u16(),
            };
        }
        if body.contains("Rate limit exceeded") {
            return AdapterError::RateLimitExceeded { venue: self.venue };
        }

        let endpoint = path.to_string();
        if body.contains("Invalid order") || body.contains("Invalid arguments:volume") {
            AdapterError::InvalidOrder { endpoint, body }
        } else if body.contains("Insufficient funds") {
            AdapterError::InsufficientFunds { endpoint, body }
        } else if body.contains("Invalid nonce") {
            AdapterError::InvalidNonce { endpoint, body }
        } else if body.contains("Cancel pending") {
            AdapterError::CancelPending { endpoint, body }
        } else {
            AdapterError::RestApi { endpoint, body }
        }
    }

    /// Spot markets with precision and limits
    pub async fn fetch_markets(&self) -> Result<Vec<MarketInfo>> {
        let rows: Rows<InstrumentInfo> = self
            .request(Method::GET, "v1/public/info", Vec::new(), Access::Public)
            .await?;

        let markets: Vec<MarketInfo> = rows
            .rows
            .iter()
            .filter_map(|row| {
                let market = row.normalize();
                if market.is_none() {
                    tracing::debug!("Skipping unparseable instrument {}", row.symbol);
                }
                market
            })
            .collect();
        tracing::info!("Loaded {} Woo markets", markets.len());
        Ok(markets)
    }

    /// Tokens with deposit/withdraw status, one entry per network
    pub async fn fetch_currencies(&self) -> Result<Vec<Currency>> {
        let rows: Rows<TokenNetwork> = self
            .request(
                Method::GET,
                "v1/public/token_network",
                Vec::new(),
                Access::Public,
            )
            .await?;
        Ok(rows.rows.iter().map(Currency::from).collect())
    }

    pub async fn fetch_order_book(&self, symbol: &str, limit: Option<u32>) -> Result<OrderBook> {
        let path = format!("v1/orderbook/{}", venue_symbol(symbol));
        let params = vec![("max_level", limit.map(|l| l.to_string()))];
        let book: OrderBookResponse = self
            .request(Method::GET, &path, params, Access::Private)
            .await?;
        Ok(book.normalize(symbol))
    }

    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        period: CandlePeriod,
        limit: Option<u32>,
    ) -> Result<Vec<Ohlcv>> {
        let params = vec![
            ("symbol", Some(symbol.to_string())),
            ("type", Some(period.as_str().to_string())),
            ("limit", limit.map(|l| l.to_string())),
        ];
        let rows: Rows<KlineRow> = self
            .request(Method::GET, "v1/kline", params, Access::Private)
            .await?;

        let mut candles: Vec<Ohlcv> = rows.rows.iter().map(Ohlcv::from).collect();
        candles.sort_by_key(|c| c.timestamp_ms);
        Ok(candles)
    }

    pub async fn fetch_balance(&self) -> Result<Vec<Balance>> {
        let response: HoldingResponse = self
            .request(Method::GET, "v2/client/holding", Vec::new(), Access::Private)
            .await?;
        Ok(response.holding.iter().map(Balance::from).collect())
    }

    /// Account maker/taker rates as fractions (`maker_fee_rate` is in basis points)
    pub async fn fetch_trading_fees(&self) -> Result<TradingFees> {
        let response: ClientInfoResponse = self
            .request(Method::GET, "v1/client/info", Vec::new(), Access::Private)
            .await?;
        Ok(TradingFees::from(&response.application))
    }

    pub async fn create_order(&self, order: &OrderRequest) -> Result<Order> {
        let price = match order.order_type {
            OrderType::Market => None,
            _ => order.price.map(|p| p.to_string()),
        };
        let params = vec![
            ("symbol", Some(order.symbol.clone())),
            ("client_order_id", order.client_order_id.map(|id| id.to_string())),
            ("order_tag", order.order_tag.clone()),
            ("order_type", Some(order.order_type.as_str().to_string())),
            ("side", Some(order.side.as_str().to_string())),
            ("order_quantity", Some(order.quantity.to_string())),
            ("order_price", price),
            ("visible_quantity", order.visible_quantity.map(|q| q.to_string())),
        ];

        let response: OrderResponse = self
            .request(Method::POST, "v1/order", params, Access::Private)
            .await?;
        let created = response.normalize(Some(&order.symbol));
        tracing::info!(
            "Created {} {} order {:?} on {}",
            order.side,
            order.order_type.as_str(),
            created.id,
            order.symbol
        );
        Ok(created)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let path = format!("v1/order/{}", order_id);
        let response: OrderResponse = self
            .request(Method::GET, &path, Vec::new(), Access::Private)
            .await?;
        Ok(response.normalize(None))
    }

    pub async fn fetch_order_trades(&self, order_id: &str) -> Result<Vec<AccountTrade>> {
        let path = format!("v1/order/{}/trades", order_id);
        let rows: Rows<TradeRow> = self
            .request(Method::GET, &path, Vec::new(), Access::Private)
            .await?;
        Ok(rows.rows.into_iter().map(AccountTrade::from).collect())
    }

    /// Own fills, optionally filtered by market and a time window (ms)
    pub async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        from_ms: Option<u64>,
        to_ms: Option<u64>,
    ) -> Result<Vec<AccountTrade>> {
        let params = vec![
            ("symbol", symbol.map(str::to_string)),
            ("start_t", from_ms.map(|t| t.to_string())),
            ("end_t", to_ms.map(|t| t.to_string())),
        ];
        let rows: Rows<TradeRow> = self
            .request(Method::GET, "v1/client/trades", params, Access::Private)
            .await?;
        Ok(rows.rows.into_iter().map(AccountTrade::from).collect())
    }

    pub async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<CancelResult> {
        let params = vec![
            ("order_id", Some(order_id.to_string())),
            ("symbol", Some(symbol.to_string())),
        ];
        let result = self
            .request(Method::DELETE, "v1/order", params, Access::Private)
            .await?;
        tracing::info!("Cancelled order {} on {}", order_id, symbol);
        Ok(result)
    }

    pub async fn cancel_all_orders(&self, symbol: &str) -> Result<CancelResult> {
        let params = vec![("symbol", Some(symbol.to_string()))];
        let result = self
            .request(Method::DELETE, "v1/orders", params, Access::Private)
            .await?;
        tracing::info!("Cancelled all orders on {}", symbol);
        Ok(result)
    }
}
