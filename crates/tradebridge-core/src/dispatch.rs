//! Broker-agnostic validation and forwarding.
//!
//! Every order passes [`validate`] before any adapter sees it. A validated
//! order is forwarded unchanged, instrument fields included, and the
//! adapter's [`OrderResult`] is returned verbatim.

use tracing::{debug, warn};

use crate::{
    Broker, BrokerError, DispatchError, Instrument, LimitOrder, MarketOrder, OrderIntent,
    OrderResult, PositionCloseResult, ShortOrder, StopOrder, UtcDateTime, ValidationError,
};

/// Checks the invariants shared by every order kind.
pub fn validate(intent: &OrderIntent) -> Result<(), ValidationError> {
    validate_basic(intent.instrument(), intent.quantity())?;

    match intent {
        OrderIntent::Limit(order) => validate_price("limit_price", order.limit_price),
        OrderIntent::Stop(order) => validate_price("stop_price", order.stop_price),
        OrderIntent::Market(_) | OrderIntent::Short(_) => Ok(()),
    }
}

fn validate_basic(instrument: &Instrument, quantity: f64) -> Result<(), ValidationError> {
    instrument.validate()?;

    if quantity.is_nan() || quantity == f64::INFINITY {
        return Err(ValidationError::NonFiniteValue { field: "quantity" });
    }
    if quantity <= 0.0 {
        return Err(ValidationError::NonPositiveQuantity { value: quantity });
    }
    Ok(())
}

fn validate_price(field: &'static str, price: f64) -> Result<(), ValidationError> {
    if price.is_nan() || price == f64::INFINITY {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if price <= 0.0 {
        return Err(ValidationError::NonPositivePrice {
            field,
            value: price,
        });
    }
    Ok(())
}

/// Validates `intent` and forwards it to the matching adapter operation.
pub async fn submit<B>(broker: &B, intent: OrderIntent) -> Result<OrderResult, DispatchError>
where
    B: Broker + ?Sized,
{
    if let Err(error) = validate(&intent) {
        warn!(
            broker = broker.name(),
            kind = intent.kind(),
            symbol = %intent.instrument().symbol,
            %error,
            "order rejected by local validation"
        );
        return Err(DispatchError::InvalidArgument(error));
    }

    debug!(
        broker = broker.name(),
        kind = intent.kind(),
        symbol = %intent.instrument().symbol,
        side = %intent.side(),
        quantity = intent.quantity(),
        "forwarding order"
    );

    let result = match intent {
        OrderIntent::Market(order) => broker.place_market_order(order).await,
        OrderIntent::Limit(order) => broker.place_limit_order(order).await,
        OrderIntent::Stop(order) => broker.place_stop_order(order).await,
        OrderIntent::Short(order) => broker.place_short_order(order).await,
    };

    result.map_err(|error| {
        warn!(broker = broker.name(), %error, "order transport failure");
        DispatchError::Transport(error)
    })
}

/// Front door the strategy talks to, bound to exactly one adapter.
///
/// Generic over the adapter so the same code drives a concrete adapter or
/// an `Arc<dyn Broker>` chosen at runtime.
#[derive(Debug, Clone)]
pub struct OrderDispatcher<B> {
    broker: B,
}

impl<B: Broker> OrderDispatcher<B> {
    pub fn new(broker: B) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn into_inner(self) -> B {
        self.broker
    }

    pub async fn submit(&self, intent: OrderIntent) -> Result<OrderResult, DispatchError> {
        submit(&self.broker, intent).await
    }

    pub async fn place_market_order(
        &self,
        order: MarketOrder,
    ) -> Result<OrderResult, DispatchError> {
        self.submit(OrderIntent::Market(order)).await
    }

    pub async fn place_limit_order(&self, order: LimitOrder) -> Result<OrderResult, DispatchError> {
        self.submit(OrderIntent::Limit(order)).await
    }

    pub async fn place_stop_order(&self, order: StopOrder) -> Result<OrderResult, DispatchError> {
        self.submit(OrderIntent::Stop(order)).await
    }

    pub async fn place_short_order(&self, order: ShortOrder) -> Result<OrderResult, DispatchError> {
        self.submit(OrderIntent::Short(order)).await
    }

    pub async fn close_all_positions(&self) -> PositionCloseResult {
        self.broker.close_all_positions().await
    }

    pub async fn is_market_open(&self) -> Result<bool, BrokerError> {
        self.broker.is_market_open().await
    }

    pub async fn next_market_open_time(&self) -> Result<Option<UtcDateTime>, BrokerError> {
        self.broker.next_market_open_time().await
    }
}
