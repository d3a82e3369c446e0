use tradebridge_core::{
    Broker, BrokerError, BrokerOrderId, Instrument, MarketOrder, OpenPosition, OrderDispatcher,
    OrderIntent, Side, TimeInForce,
};
use tradebridge_tests::{stock_position, BrokerCall, RecordingBroker};

fn close_orders(broker: &RecordingBroker) -> Vec<MarketOrder> {
    broker
        .orders()
        .into_iter()
        .map(|intent| match intent {
            OrderIntent::Market(order) => order,
            other => panic!("closing sweep sent a {} order", other.kind()),
        })
        .collect()
}

#[tokio::test]
async fn accepting_adapter_gets_one_offsetting_order_per_position() {
    let broker = RecordingBroker::accepting().with_positions(vec![
        stock_position("AAPL", 10.0),
        stock_position("TSLA", -4.0),
        stock_position("MSFT", 0.5),
    ]);

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.attempted, 3);
    assert_eq!(result.orders_sent, 3);
    assert!(result.all_accepted());

    let orders = close_orders(&broker);
    let summary: Vec<(&str, Side, f64)> = orders
        .iter()
        .map(|order| (order.instrument.symbol.as_str(), order.side, order.quantity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("AAPL", Side::Sell, 10.0),
            ("TSLA", Side::Buy, 4.0),
            ("MSFT", Side::Sell, 0.5),
        ]
    );
    assert!(orders
        .iter()
        .all(|order| order.time_in_force == TimeInForce::Day));
    assert_eq!(
        result.order_ids,
        vec![
            BrokerOrderId::new("ord-1"),
            BrokerOrderId::new("ord-2"),
            BrokerOrderId::new("ord-3"),
        ]
    );
}

#[tokio::test]
async fn one_rejection_does_not_stop_the_sweep() {
    let broker = RecordingBroker::accepting()
        .rejecting("GME", "position is locked")
        .with_positions(vec![stock_position("GME", 7.0), stock_position("AAPL", -3.0)]);

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.attempted, 2);
    assert_eq!(result.orders_sent, 1);
    assert_eq!(result.order_ids, vec![BrokerOrderId::new("ord-1")]);
    assert!(result.any_accepted());
    assert!(!result.all_accepted());
    assert_eq!(close_orders(&broker).len(), 2);
}

#[tokio::test]
async fn transport_failure_on_one_close_is_isolated() {
    let broker = RecordingBroker::accepting()
        .failing("AAPL", BrokerError::unavailable("timeout"))
        .with_positions(vec![stock_position("AAPL", 1.0), stock_position("MSFT", 2.0)]);

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.orders_sent, 1);
    assert_eq!(
        close_orders(&broker)
            .iter()
            .map(|order| order.instrument.symbol.as_str())
            .collect::<Vec<_>>(),
        vec!["AAPL", "MSFT"]
    );
}

#[tokio::test]
async fn empty_snapshot_completes_with_nothing_sent() {
    let broker = RecordingBroker::accepting();

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.orders_sent, 0);
    assert_eq!(result.attempted, 0);
    assert!(result.order_ids.is_empty());
    assert_eq!(broker.calls(), vec![BrokerCall::OpenPositions]);
}

#[tokio::test]
async fn failed_snapshot_aborts_before_any_close() {
    let broker = RecordingBroker::accepting()
        .with_snapshot_failure(BrokerError::unavailable("positions endpoint down"));

    let result = broker.close_all_positions().await;

    assert!(!result.success);
    assert_eq!(result.orders_sent, 0);
    assert!(result.message.contains("positions endpoint down"));
    assert_eq!(broker.calls(), vec![BrokerCall::OpenPositions]);
}

#[tokio::test]
async fn all_rejected_still_completes_but_reports_nothing_accepted() {
    let broker = RecordingBroker::accepting()
        .rejecting("AAPL", "market closed")
        .rejecting("MSFT", "market closed")
        .with_positions(vec![stock_position("AAPL", 1.0), stock_position("MSFT", -1.0)]);

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.attempted, 2);
    assert_eq!(result.orders_sent, 0);
    assert!(!result.any_accepted());
}

#[tokio::test]
async fn rounding_residue_counts_as_flat() {
    let broker = RecordingBroker::accepting().with_positions(vec![
        stock_position("AAPL", 1e-13),
        stock_position("MSFT", -1e-12),
        stock_position("NVDA", 3.0),
    ]);

    let result = broker.close_all_positions().await;

    assert_eq!(result.attempted, 1);
    assert_eq!(close_orders(&broker)[0].instrument.symbol, "NVDA");
}

#[tokio::test]
async fn unreadable_quantity_is_counted_but_never_accepted() {
    let broker = RecordingBroker::accepting().with_positions(vec![
        stock_position("AAPL", f64::NAN),
        stock_position("MSFT", 2.0),
    ]);

    let result = broker.close_all_positions().await;

    assert!(result.success);
    assert_eq!(result.attempted, 2);
    assert_eq!(result.orders_sent, 1);
    assert!(!result.all_accepted());
    assert_eq!(
        result.message,
        "close all positions: sent 1 of 2 market close orders; 1 positions had an unreadable quantity"
    );
    assert_eq!(close_orders(&broker)[0].instrument.symbol, "MSFT");
    assert_eq!(close_orders(&broker).len(), 1);
}

#[tokio::test]
async fn close_orders_keep_every_instrument_field() {
    let instrument = Instrument::future("IF", "202606")
        .with_exchange("CFFEX")
        .with_currency("CNH")
        .with_trading_class("IF")
        .with_multiplier("300");
    let broker = RecordingBroker::accepting().with_positions(vec![OpenPosition::new(
        instrument.clone(),
        -2.0,
        3_900.0,
    )]);

    broker.close_all_positions().await;

    assert_eq!(close_orders(&broker)[0].instrument, instrument);
}

#[tokio::test]
async fn dispatcher_close_all_passes_through() {
    let dispatcher = OrderDispatcher::new(
        RecordingBroker::accepting().with_positions(vec![stock_position("AAPL", 5.0)]),
    );

    let result = dispatcher.close_all_positions().await;

    assert_eq!(result.orders_sent, 1);
    assert_eq!(
        result.message,
        "close all positions: sent 1 of 1 market close orders"
    );
}
