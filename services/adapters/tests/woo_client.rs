//! Woo streaming client against a mock transport
//!
//! Covers the connection lifecycle, the auth gate, subscription frames and
//! inbound routing end to end through the event sink.

mod common;

use adapter_service::{
    AdapterError, AuthState, Channel, ChannelSink, ClientEvent, ConnectionState,
    StreamingClient, TransportEvent, WooClient,
};
use common::{
    btc_usdt, eth_usdt, harness, harness_with_config, test_config, wait_until, MockFactory,
};
use std::sync::Arc;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use types::Side;

fn trade_frame(symbol: &str, price: f64) -> serde_json::Value {
    json!({
        "topic": format!("{}@trade", symbol),
        "ts": 1618820361552u64,
        "data": {"symbol": symbol, "price": price, "size": 0.0001, "side": "BUY"}
    })
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let mut h = harness(false);
    h.connect().await;

    h.client.connect().await.unwrap();
    h.client.connect().await.unwrap();

    assert_eq!(h.factory.created(), 1);
    assert_eq!(h.client.connection_state(), ConnectionState::Connected);
    assert!(h.client.heartbeat_armed());
}

#[tokio::test]
async fn test_close_then_connect_builds_fresh_transport() {
    let mut h = harness(false);
    h.connect().await;

    h.client.close().await.unwrap();
    h.expect_event("closed").await;
    assert!(!h.client.heartbeat_armed());

    h.connect().await;
    assert_eq!(h.factory.created(), 2);
}

#[tokio::test]
async fn test_trade_subscription_and_routing() {
    let mut h = harness(false);
    h.connect().await;

    h.client.subscribe(Channel::Trade, &btc_usdt()).await.unwrap();

    let sent = h.transport().sent_json();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["event"], "subscribe");
    assert_eq!(sent[0]["topic"], "SPOT_BTC_USDT@trade");
    assert_eq!(sent[0]["id"], h.client.client_id());
    assert!(h.client.client_id().starts_with("PUB_"));

    h.transport().inject_message(trade_frame("SPOT_BTC_USDT", 56644.01));

    match h.next_event().await {
        ClientEvent::Trade(trade, market) => {
            assert_eq!(market, btc_usdt());
            assert_eq!(trade.base, "BTC");
            assert_eq!(trade.quote, "USDT");
            assert_eq!(trade.price, dec!(56644.01));
            assert_eq!(trade.amount, dec!(0.0001));
            assert_eq!(trade.side, Side::Buy);
        }
        other => panic!("expected trade, got {:?}", other),
    }
}

#[tokio::test]
async fn test_batch_frames_emit_in_order() {
    let mut h = harness(false);
    h.connect().await;
    h.client.subscribe(Channel::Trade, &btc_usdt()).await.unwrap();

    h.transport().inject_message(json!([
        trade_frame("SPOT_BTC_USDT", 100.0),
        trade_frame("SPOT_BTC_USDT", 101.0)
    ]));

    let prices: Vec<_> = [h.next_event().await, h.next_event().await]
        .into_iter()
        .map(|event| match event {
            ClientEvent::Trade(trade, _) => trade.price,
            other => panic!("expected trade, got {:?}", other),
        })
        .collect();
    assert_eq!(prices, vec![dec!(100), dec!(101)]);
}

#[tokio::test]
async fn test_frames_for_unsubscribed_markets_are_dropped() {
    let mut h = harness(false);
    h.connect().await;
    h.client.subscribe(Channel::Trade, &btc_usdt()).await.unwrap();

    h.transport().inject_message(trade_frame("SPOT_ETH_USDT", 3000.0));
    h.transport().inject_message(json!({"event": "pong", "ts": 1618820361552u64}));

    assert_eq!(h.next_event().await.name(), "pong");
}

#[tokio::test]
async fn test_level2_sends_subscribe_then_snapshot_request() {
    let mut h = harness(false);
    h.connect().await;

    h.client.subscribe(Channel::Level2, &btc_usdt()).await.unwrap();

    let sent = h.transport().sent_json();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["event"], "subscribe");
    assert_eq!(sent[0]["topic"], "SPOT_BTC_USDT@orderbookupdate");
    assert_eq!(sent[1]["event"], "request");
    assert_eq!(sent[1]["params"]["type"], "orderbook");
    assert_eq!(sent[1]["params"]["symbol"], "SPOT_BTC_USDT");
}

#[tokio::test]
async fn test_subscribe_unsubscribe_round_trip() {
    let mut h = harness(false);
    h.connect().await;
    let market = btc_usdt();

    h.client.subscribe(Channel::Ticker, &market).await.unwrap();
    assert!(h.client.registry().contains(Channel::Ticker, &market));

    h.client.unsubscribe(Channel::Ticker, &market).await.unwrap();
    assert!(h.client.registry().is_empty());

    let unsubscribes = h.transport().sent_events("unsubscribe");
    assert_eq!(unsubscribes.len(), 1);
    assert_eq!(unsubscribes[0]["topic"], "SPOT_BTC_USDT@ticker");

    // Unknown market: no frame
    h.client.unsubscribe(Channel::Ticker, &eth_usdt()).await.unwrap();
    assert_eq!(h.transport().sent_events("unsubscribe").len(), 1);
}

#[tokio::test]
async fn test_subscribe_while_disconnected_records_entry() {
    let h = harness(false);
    let market = btc_usdt();

    let result = h.client.subscribe(Channel::Bbo, &market).await;
    assert!(matches!(result, Err(AdapterError::NotConnected { .. })));
    assert!(h.client.registry().contains(Channel::Bbo, &market));
}

#[tokio::test]
async fn test_unsupported_channel_rejected() {
    let mut h = harness(false);
    h.connect().await;

    let result = h.client.subscribe(Channel::Level3, &btc_usdt()).await;
    assert!(matches!(result, Err(AdapterError::NotSupported(_))));
    assert!(h.transport().sent().is_empty());
    assert!(h.client.registry().is_empty());
}

#[tokio::test]
async fn test_orders_without_credentials_fails_without_sending() {
    let mut h = harness(false);
    h.connect().await;

    let result = h.client.subscribe(Channel::Orders, &btc_usdt()).await;
    assert!(matches!(result, Err(AdapterError::MissingCredentials { .. })));
    assert!(h.transport().sent().is_empty());
}

#[tokio::test]
async fn test_orders_subscription_authenticates_first() {
    let mut h = harness(true);
    h.connect().await;
    assert!(h.client.client_id().starts_with("PRIV_"));

    let client = h.client.clone();
    let subscribe =
        tokio::spawn(async move { client.subscribe(Channel::Orders, &btc_usdt()).await });

    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    assert_eq!(h.client.auth_state(), AuthState::Pending);

    let auth = &transport.sent_events("auth")[0];
    assert_eq!(auth["id"], h.client.client_id());
    assert_eq!(auth["params"]["apikey"], "test-key");

    transport.inject_message(json!({"id": h.client.client_id(), "event": "auth", "success": true}));
    subscribe.await.unwrap().unwrap();

    assert_eq!(h.client.auth_state(), AuthState::Authenticated);
    let sent = transport.sent_json();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["topic"], "executionreport");
}

#[tokio::test]
async fn test_concurrent_gate_callers_share_one_challenge() {
    let mut h = harness(true);
    h.connect().await;

    let first = h.client.clone();
    let second = h.client.clone();
    let a = tokio::spawn(async move { first.await_authenticated().await });
    let b = tokio::spawn(async move { second.await_authenticated().await });

    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.sent_events("auth").len(), 1);

    transport.inject_message(json!({"event": "auth", "success": true}));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Already authenticated: no new challenge
    h.client.await_authenticated().await.unwrap();
    assert_eq!(transport.sent_events("auth").len(), 1);
}

#[tokio::test]
async fn test_rejected_auth_fails_fast_until_reconnect() {
    let mut h = harness(true);
    h.connect().await;

    let client = h.client.clone();
    let gate = tokio::spawn(async move { client.await_authenticated().await });

    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    transport.inject_message(json!({"event": "auth", "success": false}));

    let result = gate.await.unwrap();
    assert!(matches!(result, Err(AdapterError::AuthenticationFailed { .. })));
    match h.expect_event("error").await {
        ClientEvent::Error(e) => assert!(e.is_authorization()),
        _ => unreachable!(),
    }

    transport.clear();
    let retry = h.client.await_authenticated().await;
    assert!(matches!(retry, Err(AdapterError::AuthenticationFailed { .. })));
    assert!(transport.sent().is_empty());
    assert_eq!(h.client.auth_state(), AuthState::Rejected);

    // Private subscribe is refused without touching the wire
    let orders = h.client.subscribe(Channel::Orders, &btc_usdt()).await;
    assert!(matches!(orders, Err(AdapterError::AuthenticationFailed { .. })));
    assert!(transport.sent().is_empty());

    // A fresh connection starts over
    transport.inject(TransportEvent::Disconnected);
    wait_until(|| h.client.auth_state() == AuthState::NotAuthenticated).await;
}

#[tokio::test]
async fn test_disconnect_releases_pending_gate() {
    let mut h = harness(true);
    h.connect().await;

    let client = h.client.clone();
    let gate = tokio::spawn(async move { client.await_authenticated().await });

    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    transport.inject(TransportEvent::Disconnected);

    let result = gate.await.unwrap();
    assert!(matches!(result, Err(AdapterError::ConnectionClosed { .. })));
    assert!(!h.client.heartbeat_armed());
}

#[tokio::test]
async fn test_reconnect_replays_registry() {
    let mut h = harness(false);
    h.connect().await;
    let market = btc_usdt();

    h.client.subscribe(Channel::Trade, &market).await.unwrap();
    h.client.subscribe(Channel::Level2, &market).await.unwrap();
    let transport = h.transport();
    assert_eq!(transport.sent().len(), 3);
    transport.clear();

    transport.inject(TransportEvent::Disconnected);
    h.expect_event("disconnected").await;
    transport.inject(TransportEvent::Connected);
    h.expect_event("connected").await;

    wait_until(|| transport.sent().len() == 3).await;
    let topics: Vec<_> = transport
        .sent_events("subscribe")
        .iter()
        .filter_map(|frame| frame["topic"].as_str().map(str::to_string))
        .collect();
    assert!(topics.contains(&"SPOT_BTC_USDT@trade".to_string()));
    assert!(topics.contains(&"SPOT_BTC_USDT@orderbookupdate".to_string()));
    assert_eq!(transport.sent_events("request").len(), 1);
}

#[tokio::test]
async fn test_subscribe_before_first_connected_is_sent_once_up() {
    let mut h = harness(false);
    h.client.connect().await.unwrap();

    // The transport has not reported Connected yet
    let result = h.client.subscribe(Channel::Trade, &btc_usdt()).await;
    assert!(matches!(result, Ok(()) | Err(AdapterError::NotConnected { .. })));

    h.expect_event("connected").await;
    let transport = h.transport();
    wait_until(|| transport.sent_events("subscribe").len() == 1).await;
    assert_eq!(
        transport.sent_events("subscribe")[0]["topic"],
        "SPOT_BTC_USDT@trade"
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_orders_registered_before_connect_authenticate_on_first_connected() {
    let mut h = harness(true);
    let market = btc_usdt();

    let result = h.client.subscribe(Channel::Orders, &market).await;
    assert!(matches!(result, Err(AdapterError::NotConnected { .. })));

    h.connect().await;
    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    transport.inject_message(json!({"id": h.client.client_id(), "event": "auth", "success": true}));

    wait_until(|| transport.sent_events("subscribe").len() == 1).await;
    assert_eq!(transport.sent_events("subscribe")[0]["topic"], "executionreport");
    assert_eq!(h.client.auth_state(), AuthState::Authenticated);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gate_started_on_connected_survives_connect_handling() {
    let mut h = harness(true);
    let client = h.client.clone();
    let gate = tokio::spawn(async move {
        while client.connection_state() != ConnectionState::Connected {
            tokio::task::yield_now().await;
        }
        client.await_authenticated().await
    });

    h.client.connect().await.unwrap();
    h.expect_event("connected").await;

    let transport = h.transport();
    wait_until(|| !transport.sent_events("auth").is_empty()).await;
    transport.inject_message(json!({"event": "auth", "success": true}));

    gate.await.unwrap().unwrap();
    assert_eq!(transport.sent_events("auth").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_level2_frame_pairs_are_not_interleaved() {
    let mut h = harness_with_config(adapter_service::WooConfig {
        send_throttle_ms: 5,
        ..test_config(false)
    });
    h.connect().await;

    let markets = [btc_usdt(), eth_usdt()];
    let tasks: Vec<_> = markets
        .iter()
        .cloned()
        .map(|market| {
            let client = h.client.clone();
            tokio::spawn(async move { client.subscribe(Channel::Level2, &market).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let sent = h.transport().sent_json();
    assert_eq!(sent.len(), 4);
    for pair in sent.chunks(2) {
        assert_eq!(pair[0]["event"], "subscribe");
        assert_eq!(pair[1]["event"], "request");
        let topic = pair[0]["topic"].as_str().unwrap();
        let symbol = pair[1]["params"]["symbol"].as_str().unwrap();
        assert_eq!(topic, format!("{}@orderbookupdate", symbol));
    }
}

#[test]
fn test_zero_ping_interval_is_rejected() {
    let config = adapter_service::WooConfig {
        ping_interval_ms: 0,
        ..test_config(false)
    };
    let (sink, _events) = ChannelSink::new();
    let result = WooClient::with_transport_factory(
        &config,
        Arc::new(MockFactory::default()),
        Arc::new(sink),
    );
    assert!(matches!(result, Err(AdapterError::Configuration(_))));
}

#[tokio::test]
async fn test_subscription_rejection_surfaces_error() {
    let mut h = harness(false);
    h.connect().await;
    h.client.subscribe(Channel::Trade, &btc_usdt()).await.unwrap();

    h.transport().inject_message(json!({
        "id": h.client.client_id(),
        "event": "subscribe",
        "success": false,
        "topic": "SPOT_BTC_USDT@trade"
    }));

    match h.expect_event("error").await {
        ClientEvent::Error(AdapterError::SubscriptionRejected { topic, .. }) => {
            assert_eq!(topic.as_deref(), Some("SPOT_BTC_USDT@trade"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    // Desired state is kept for the next replay
    assert!(h.client.registry().contains(Channel::Trade, &btc_usdt()));
}

#[tokio::test]
async fn test_transport_send_failure_is_returned() {
    let mut h = harness(false);
    h.connect().await;
    h.transport().fail_sends(true);

    let result = h.client.subscribe(Channel::Candle, &btc_usdt()).await;
    assert!(matches!(result, Err(AdapterError::ConnectionClosed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_pings_only_while_connected() {
    let mut h = harness(false);
    h.connect().await;
    let transport = h.transport();

    tokio::time::sleep(Duration::from_millis(25_000)).await;
    assert_eq!(transport.sent(), vec![r#"{"event":"ping"}"#; 2]);

    transport.inject(TransportEvent::Disconnected);
    h.expect_event("disconnected").await;
    assert!(!h.client.heartbeat_armed());

    tokio::time::sleep(Duration::from_millis(30_000)).await;
    assert_eq!(transport.sent().len(), 2);
}
