//! Woo REST collaborator against a mock HTTP server

mod common;

use adapter_service::rest::{Liquidity, OrderRequest, OrderStatus};
use adapter_service::{AdapterError, WooConfig, WooRestClient};
use common::test_config;
use mockito::{Matcher, Server, ServerGuard};
use rust_decimal_macros::dec;
use types::{CandlePeriod, Side};

fn client_for(server: &ServerGuard, with_credentials: bool) -> WooRestClient {
    let config = WooConfig {
        rest_url: format!("{}/", server.url()),
        ..test_config(with_credentials)
    };
    WooRestClient::new(&config).unwrap()
}

fn signed() -> Vec<(&'static str, Matcher)> {
    vec![
        ("x-api-key", Matcher::Exact("test-key".to_string())),
        ("x-api-signature", Matcher::Regex("^[0-9a-f]{64}$".to_string())),
        ("x-api-timestamp", Matcher::Regex("^[0-9]{13}$".to_string())),
        ("cache-control", Matcher::Exact("no-cache".to_string())),
    ]
}

#[tokio::test]
async fn test_fetch_markets_is_public_and_normalized() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/public/info")
        .match_query(Matcher::Any)
        .match_header("x-api-key", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"success":true,"rows":[
                {"symbol":"SPOT_BTC_USDT","quote_min":"0","quote_max":"100000","quote_tick":"0.01",
                 "base_min":"0.0001","base_max":"20","base_tick":"0.0001","min_notional":"10",
                 "price_range":"0.1","created_time":"1575441595.65","updated_time":"1639108800.03"},
                {"symbol":"BROKEN","quote_tick":"1","base_min":"1","min_notional":"1"}
            ]}"#,
        )
        .create_async()
        .await;

    let markets = client_for(&server, false).fetch_markets().await.unwrap();
    mock.assert_async().await;

    assert_eq!(markets.len(), 1);
    let btc = &markets[0];
    assert_eq!(btc.id, "BTC_USDT");
    assert_eq!(btc.symbol, "BTC/USDT");
    assert_eq!(btc.price_precision, 2);
    assert_eq!(btc.amount_precision, 4);
    assert_eq!(btc.max_amount, Some(dec!(20)));
}

#[tokio::test]
async fn test_private_call_without_credentials_fails_locally() {
    let server = Server::new_async().await;
    let result = client_for(&server, false).fetch_balance().await;
    assert!(matches!(result, Err(AdapterError::MissingCredentials { .. })));
}

#[tokio::test]
async fn test_fetch_balance_signs_request() {
    let mut server = Server::new_async().await;
    let mut mock = server
        .mock("GET", "/v2/client/holding")
        .match_query(Matcher::Any);
    for (header, matcher) in signed() {
        mock = mock.match_header(header, matcher);
    }
    let mock = mock
        .with_status(200)
        .with_body(
            r#"{"success":true,"holding":[
                {"token":"USDT","holding":"1000","frozen":"0","interest":"0",
                 "outstanding_holding":"-250","pending_exposure":"0","opening_cost":"0",
                 "holding_cost":"0","realised_pnl":"0","settled_pnl":"0","fee_24_h":"0",
                 "settled_pnl_24_h":"0","updated_time":"1642660922.000"}
            ]}"#,
        )
        .create_async()
        .await;

    let balances = client_for(&server, true).fetch_balance().await.unwrap();
    mock.assert_async().await;

    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0].code, "USDT");
    assert_eq!(balances[0].total, dec!(1000));
    assert_eq!(balances[0].free, dec!(750));
    assert_eq!(balances[0].used, dec!(250));
}

#[tokio::test]
async fn test_create_limit_order_sends_sorted_params() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/order")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "SPOT_BTC_USDT".into()),
            Matcher::UrlEncoded("side".into(), "BUY".into()),
            Matcher::UrlEncoded("order_type".into(), "LIMIT".into()),
            Matcher::UrlEncoded("order_price".into(), "42000".into()),
            Matcher::UrlEncoded("order_quantity".into(), "0.00025".into()),
        ]))
        .match_header("content-type", "application/x-www-form-urlencoded")
        .with_status(200)
        .with_body(
            r#"{"success":true,"order_id":91602884,"client_order_id":0,"order_type":"LIMIT",
                "order_price":42000,"order_quantity":0.00025,"order_amount":null,
                "timestamp":"1642688656.024"}"#,
        )
        .create_async()
        .await;

    let request = OrderRequest::limit("BTC_USDT", Side::Buy, dec!(0.00025), dec!(42000));
    let order = client_for(&server, true).create_order(&request).await.unwrap();
    mock.assert_async().await;

    assert_eq!(order.id.as_deref(), Some("91602884"));
    assert_eq!(order.symbol.as_deref(), Some("BTC/USDT"));
    assert_eq!(order.order_type.as_deref(), Some("LIMIT"));
    assert_eq!(order.price, Some(dec!(42000)));
    assert_eq!(order.amount, Some(dec!(0.00025)));
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.timestamp, Some(1642688656024));
}

#[tokio::test]
async fn test_market_order_omits_price() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/order")
        .match_query(Matcher::Exact(
            "order_quantity=1&order_type=MARKET&side=SELL&symbol=SPOT_BTC_USDT".to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"success":true,"order_id":7,"order_type":"MARKET","timestamp":"1642688656.000"}"#)
        .create_async()
        .await;

    let mut request = OrderRequest::market("BTC_USDT", Side::Sell, dec!(1));
    request.price = Some(dec!(5));
    let order = client_for(&server, true).create_order(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(order.id.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_failed_response_becomes_rest_error() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/order")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"success":false,"code":-1006,"message":"Your order and symbol are not valid or already canceled."}"#)
        .create_async()
        .await;

    let result = client_for(&server, true).cancel_order("123", "BTC_USDT").await;
    match result {
        Err(AdapterError::RestApi { endpoint, body }) => {
            assert_eq!(endpoint, "v1/order");
            assert!(body.contains("-1006"));
        }
        other => panic!("expected RestApi error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_success_false_with_ok_status_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/v1/orders")
        .match_query(Matcher::UrlEncoded("symbol".into(), "SPOT_ETH_USDT".into()))
        .with_status(200)
        .with_body(r#"{"success":false,"message":"nope"}"#)
        .create_async()
        .await;

    let result = client_for(&server, true).cancel_all_orders("ETH_USDT").await;
    assert!(matches!(result, Err(AdapterError::RestApi { .. })));
}

#[tokio::test]
async fn test_rate_limit_status_maps_to_rate_limit_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/public/token_network")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("too many requests")
        .create_async()
        .await;

    let result = client_for(&server, false).fetch_currencies().await;
    assert!(matches!(result, Err(AdapterError::RateLimitExceeded { .. })));
}

#[tokio::test]
async fn test_fetch_order_book_uses_path_symbol() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/orderbook/SPOT_BTC_USDT")
        .match_query(Matcher::UrlEncoded("max_level".into(), "2".into()))
        .with_status(200)
        .with_body(
            r#"{"success":true,
                "asks":[{"price":"42010","quantity":"0.5"},{"price":"42020","quantity":"1"}],
                "bids":[{"price":"42000","quantity":"0.25"}],
                "timestamp":"1642607902927"}"#,
        )
        .create_async()
        .await;

    let book = client_for(&server, true)
        .fetch_order_book("BTC_USDT", Some(2))
        .await
        .unwrap();
    mock.assert_async().await;

    assert_eq!(book.symbol, "BTC_USDT");
    assert_eq!(book.timestamp, Some(1642607902927));
    assert_eq!(book.asks.len(), 2);
    assert_eq!(book.bids[0].price, dec!(42000));
    assert_eq!(book.bids[0].size, dec!(0.25));
}

#[tokio::test]
async fn test_fetch_ohlcv_sorted_ascending() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/kline")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "SPOT_BTC_USDT".into()),
            Matcher::UrlEncoded("type".into(), "5m".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"success":true,"rows":[
                {"open":"2","close":"3","low":"1","high":"4","volume":"10","amount":"25",
                 "symbol":"SPOT_BTC_USDT","type":"5m","start_timestamp":"1642608300000","end_timestamp":"1642608600000"},
                {"open":"1","close":"2","low":"1","high":"2","volume":"5","amount":"8",
                 "symbol":"SPOT_BTC_USDT","type":"5m","start_timestamp":"1642608000000","end_timestamp":"1642608300000"}
            ]}"#,
        )
        .create_async()
        .await;

    let candles = client_for(&server, true)
        .fetch_ohlcv("BTC_USDT", CandlePeriod::FiveMinutes, None)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].timestamp_ms, 1642608000000);
    assert_eq!(candles[1].close, dec!(3));
    assert_eq!(candles[1].amount, Some(dec!(25)));
}

#[tokio::test]
async fn test_fetch_order_and_its_trades() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/order/91647996")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"success":true,"symbol":"SPOT_BTC_USDT","status":"FILLED","side":"BUY",
                "created_time":"1642714823.000","order_id":91647996,"order_tag":"default",
                "price":null,"type":"MARKET","quantity":"0.00025","amount":null,
                "visible":"0.00025","executed":"0.00025","total_fee":"0.0000001",
                "fee_asset":"BTC","client_order_id":null,"average_executed_price":"42000"}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/v1/order/91647996/trades")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"success":true,"rows":[
                {"id":105749148,"symbol":"SPOT_BTC_USDT","fee":"0.0000001","side":"BUY",
                 "executed_timestamp":"1642714823.149","order_id":91647996,
                 "executed_price":"42000","executed_quantity":"0.00025",
                 "fee_asset":"BTC","is_maker":"1"}
            ]}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server, true);
    let order = client.fetch_order("91647996").await.unwrap();
    assert_eq!(order.status, OrderStatus::Closed);
    assert_eq!(order.filled, Some(dec!(0.00025)));
    assert_eq!(order.average, Some(dec!(42000)));
    assert_eq!(order.fee.unwrap().currency.as_deref(), Some("BTC"));

    let trades = client.fetch_order_trades("91647996").await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id.as_deref(), Some("105749148"));
    assert_eq!(trades[0].liquidity, Some(Liquidity::Maker));
    assert_eq!(trades[0].cost, dec!(10.5));
    assert_eq!(trades[0].timestamp_ms, Some(1642714823149));
}

#[tokio::test]
async fn test_fetch_my_trades_passes_window() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/client/trades")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "SPOT_BTC_USDT".into()),
            Matcher::UrlEncoded("start_t".into(), "1642700000000".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"success":true,"meta":{"total":0,"records_per_page":25,"current_page":1},"rows":[]}"#)
        .create_async()
        .await;

    let trades = client_for(&server, true)
        .fetch_my_trades(Some("BTC_USDT"), Some(1642700000000), None)
        .await
        .unwrap();
    mock.assert_async().await;
    assert!(trades.is_empty());
}

#[tokio::test]
async fn test_fetch_trading_fees_converts_basis_points() {
    let mut server = Server::new_async().await;
    let mut mock = server
        .mock("GET", "/v1/client/info")
        .match_query(Matcher::Any);
    for (header, matcher) in signed() {
        mock = mock.match_header(header, matcher);
    }
    let mock = mock
        .with_status(200)
        .with_body(
            r#"{"success":true,"application":{
                "application_id":"8935820a-6600-4c2c-9bc3-f017d89aa173",
                "account_mode":"PURE_SPOT","leverage":"1.00",
                "taker_fee_rate":"5.00","maker_fee_rate":"2.00"}}"#,
        )
        .create_async()
        .await;

    let fees = client_for(&server, true).fetch_trading_fees().await.unwrap();
    mock.assert_async().await;

    assert_eq!(fees.maker, dec!(0.0002));
    assert_eq!(fees.taker, dec!(0.0005));
}

#[tokio::test]
async fn test_fetch_trading_fees_needs_credentials() {
    let server = Server::new_async().await;
    let result = client_for(&server, false).fetch_trading_fees().await;
    assert!(matches!(result, Err(AdapterError::MissingCredentials { .. })));
}

#[tokio::test]
async fn test_status_520_maps_to_exchange_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/public/info")
        .match_query(Matcher::Any)
        .with_status(520)
        .with_body("origin error")
        .create_async()
        .await;

    let result = client_for(&server, false).fetch_markets().await;
    assert!(matches!(
        result,
        Err(AdapterError::ExchangeUnavailable { status: 520, .. })
    ));
}

#[tokio::test]
async fn test_failure_bodies_map_to_typed_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/order")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"success":false,"code":-1103,"message":"Insufficient funds in account"}"#)
        .create_async()
        .await;
    server
        .mock("DELETE", "/v1/order")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"success":false,"message":"Cancel pending for order 123"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/client/trades")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"success":false,"message":"Rate limit exceeded, slow down"}"#)
        .create_async()
        .await;

    let client = client_for(&server, true);
    let request = OrderRequest::market("BTC_USDT", Side::Buy, dec!(1));

    let result = client.create_order(&request).await;
    match result {
        Err(AdapterError::InsufficientFunds { endpoint, body }) => {
            assert_eq!(endpoint, "v1/order");
            assert!(body.contains("-1103"));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    let result = client.cancel_order("123", "BTC_USDT").await;
    assert!(matches!(result, Err(AdapterError::CancelPending { .. })));

    let result = client.fetch_my_trades(None, None, None).await;
    assert!(matches!(result, Err(AdapterError::RateLimitExceeded { .. })));
}
