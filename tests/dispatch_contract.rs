use std::sync::Arc;

use tradebridge_core::{
    Broker, BrokerError, DispatchError, InMemorySessionGateway, Instrument, LimitOrder,
    MarketOrder, OrderDispatcher, OrderIntent, SessionBroker, ShortOrder, Side, StopOrder,
    TimeInForce, ValidationError,
};
use tradebridge_tests::{utc, BrokerCall, RecordingBroker};

fn spy() -> Instrument {
    Instrument::stock("SPY")
}

fn intents_with_quantity(quantity: f64) -> Vec<OrderIntent> {
    vec![
        MarketOrder::new(spy(), Side::Buy, quantity).into(),
        LimitOrder::new(spy(), Side::Buy, quantity, 500.0).into(),
        StopOrder::new(spy(), Side::Sell, quantity, 490.0).into(),
        ShortOrder::new(spy(), quantity).into(),
    ]
}

#[tokio::test]
async fn non_positive_quantities_never_reach_the_adapter() {
    for quantity in [0.0, -1.0, -0.0001, f64::NEG_INFINITY, f64::NAN] {
        for intent in intents_with_quantity(quantity) {
            let dispatcher = OrderDispatcher::new(RecordingBroker::accepting());
            let kind = intent.kind();

            let error = dispatcher
                .submit(intent)
                .await
                .expect_err("invalid quantity must fail");
            assert!(
                error.is_invalid_argument(),
                "{kind} with quantity {quantity}: {error:?}"
            );
            assert!(
                dispatcher.broker().calls().is_empty(),
                "{kind} with quantity {quantity} reached the adapter"
            );
        }
    }
}

#[tokio::test]
async fn non_positive_prices_never_reach_the_adapter() {
    let dispatcher = OrderDispatcher::new(RecordingBroker::accepting());

    for price in [0.0, -12.5] {
        let limit = dispatcher
            .place_limit_order(LimitOrder::new(spy(), Side::Buy, 1.0, price))
            .await
            .expect_err("limit price must be positive");
        assert_eq!(
            limit,
            DispatchError::InvalidArgument(ValidationError::NonPositivePrice {
                field: "limit_price",
                value: price,
            })
        );

        let stop = dispatcher
            .place_stop_order(StopOrder::new(spy(), Side::Sell, 1.0, price))
            .await
            .expect_err("stop price must be positive");
        assert!(stop.is_invalid_argument());
    }

    assert!(dispatcher.broker().calls().is_empty());
}

#[tokio::test]
async fn blank_symbols_and_monthless_futures_are_invalid() {
    let dispatcher = OrderDispatcher::new(RecordingBroker::accepting());

    let blank = dispatcher
        .place_market_order(MarketOrder::new(Instrument::stock("  "), Side::Buy, 1.0))
        .await
        .expect_err("blank symbol");
    assert_eq!(
        blank,
        DispatchError::InvalidArgument(ValidationError::EmptySymbol)
    );

    let mut future = Instrument::future("IF", "202606");
    future.contract_month = None;
    let monthless = dispatcher
        .place_short_order(ShortOrder::new(future, 1.0))
        .await
        .expect_err("futures need a month");
    assert!(matches!(
        monthless,
        DispatchError::InvalidArgument(ValidationError::MissingContractMonth { .. })
    ));

    assert!(dispatcher.broker().calls().is_empty());
}

#[tokio::test]
async fn accepted_market_order_returns_adapter_result_verbatim() {
    let dispatcher = OrderDispatcher::new(RecordingBroker::accepting());
    let order = MarketOrder::new(spy(), Side::Buy, 10.0).with_time_in_force(TimeInForce::Day);

    let result = dispatcher
        .place_market_order(order.clone())
        .await
        .expect("valid order");

    assert!(result.is_accepted());
    assert_eq!(result.broker_order_id().map(|id| id.as_str()), Some("ord-1"));
    assert_eq!(
        dispatcher.broker().calls(),
        vec![BrokerCall::Order(OrderIntent::Market(order))]
    );
}

#[tokio::test]
async fn broker_specific_instrument_fields_pass_through_unchanged() {
    let dispatcher = OrderDispatcher::new(RecordingBroker::accepting());
    let instrument = Instrument::future("IF", "202606")
        .with_exchange("CFFEX")
        .with_currency("CNH")
        .with_trading_class("IF")
        .with_multiplier("300");
    let order = LimitOrder::new(instrument, Side::Sell, 2.0, 3_950.0)
        .with_time_in_force(TimeInForce::GoodTillCanceled);

    dispatcher
        .place_limit_order(order.clone())
        .await
        .expect("valid order");

    assert_eq!(dispatcher.broker().orders(), vec![OrderIntent::Limit(order)]);
}

#[tokio::test]
async fn business_rejection_is_a_result_not_an_error() {
    let dispatcher = OrderDispatcher::new(
        RecordingBroker::accepting().rejecting("GME", "symbol is not shortable"),
    );

    let result = dispatcher
        .place_short_order(ShortOrder::new(Instrument::stock("GME"), 5.0))
        .await
        .expect("rejection is not an error");

    assert!(!result.is_accepted());
    assert_eq!(result.message(), "symbol is not shortable");
    assert!(result.broker_order_id().is_none());
}

#[tokio::test]
async fn transport_failure_surfaces_as_transport_error() {
    let dispatcher = OrderDispatcher::new(
        RecordingBroker::accepting().failing("SPY", BrokerError::unavailable("connection reset")),
    );

    let error = dispatcher
        .place_market_order(MarketOrder::new(spy(), Side::Buy, 1.0))
        .await
        .expect_err("transport failure");

    assert_eq!(
        error,
        DispatchError::Transport(BrokerError::unavailable("connection reset"))
    );
    assert_eq!(dispatcher.broker().orders().len(), 1);
}

#[tokio::test]
async fn clock_queries_pass_straight_through() {
    let next_open = utc("2026-03-02T14:30:00Z");
    let dispatcher = OrderDispatcher::new(
        RecordingBroker::accepting()
            .with_market_open(Ok(true))
            .with_next_open(next_open),
    );

    assert!(dispatcher.is_market_open().await.expect("clock ok"));
    assert_eq!(
        dispatcher.next_market_open_time().await.expect("clock ok"),
        Some(next_open)
    );
    assert_eq!(
        dispatcher.broker().calls(),
        vec![BrokerCall::IsMarketOpen, BrokerCall::NextMarketOpenTime]
    );
}

#[tokio::test]
async fn one_dispatcher_drives_adapters_chosen_at_runtime() {
    let adapters: Vec<Arc<dyn Broker>> = vec![
        Arc::new(RecordingBroker::accepting()),
        Arc::new(SessionBroker::new(InMemorySessionGateway::new())),
    ];

    for adapter in adapters {
        let dispatcher = OrderDispatcher::new(adapter);
        let name = dispatcher.broker().name().to_owned();

        let accepted = dispatcher
            .place_market_order(MarketOrder::new(spy(), Side::Buy, 1.0))
            .await
            .unwrap_or_else(|error| panic!("{name}: {error}"));
        assert!(accepted.is_accepted(), "{name}: {}", accepted.message());

        let invalid = dispatcher
            .place_market_order(MarketOrder::new(spy(), Side::Buy, 0.0))
            .await
            .expect_err("zero quantity");
        assert!(invalid.is_invalid_argument(), "{name}");
    }
}
