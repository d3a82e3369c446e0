use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::broker::BrokerFuture;
use crate::window::{OpenWindow, UtcSessionWindow};
use crate::{
    Broker, BrokerError, BrokerOrderId, Clock, Instrument, LimitOrder, MarketOrder, OpenPosition,
    OrderResult, SecurityType, ShortOrder, Side, StopOrder, SystemClock, TimeInForce,
    UtcDateTime,
};

/// Contract description as the session gateway expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub symbol: String,
    pub sec_type: SecurityType,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub contract_month: Option<String>,
    pub trading_class: Option<String>,
    pub multiplier: Option<String>,
}

impl ContractSpec {
    /// Futures keep their month, and trading class and multiplier when set.
    /// Other security types only carry symbol, type, venue and currency.
    pub fn from_instrument(instrument: &Instrument) -> Self {
        let mut contract = Self {
            symbol: instrument.symbol.clone(),
            sec_type: instrument.sec_type,
            exchange: instrument.exchange.clone(),
            currency: instrument.currency.clone(),
            contract_month: None,
            trading_class: None,
            multiplier: None,
        };

        if instrument.sec_type == SecurityType::Future {
            contract.contract_month = instrument.contract_month.clone();
            contract.trading_class = non_blank(&instrument.trading_class);
            contract.multiplier = non_blank(&instrument.multiplier);
        }
        contract
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(str::to_owned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketAction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl From<Side> for TicketAction {
    fn from(value: Side) -> Self {
        match value {
            Side::Buy => Self::Buy,
            Side::Sell => Self::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketType {
    #[serde(rename = "MKT")]
    Market,
    #[serde(rename = "LMT")]
    Limit,
    #[serde(rename = "STP")]
    Stop,
}

/// Order ticket in gateway vocabulary; the stop price travels as `aux_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub action: TicketAction,
    pub order_type: TicketType,
    pub total_quantity: f64,
    pub lmt_price: Option<f64>,
    pub aux_price: Option<f64>,
    pub tif: String,
}

impl OrderTicket {
    fn new(action: TicketAction, order_type: TicketType, quantity: f64, tif: TimeInForce) -> Self {
        Self {
            action,
            order_type,
            total_quantity: quantity,
            lmt_price: None,
            aux_price: None,
            tif: tif.code().to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Stateful session connection (order-id allocation, placement, snapshots).
///
/// `place_order` returning `Ok` means the gateway took the ticket; the
/// exchange verdict and fills arrive later through the session callbacks.
pub trait SessionGateway: Send + Sync {
    fn next_order_id<'a>(&'a self) -> BrokerFuture<'a, Result<i64, GatewayError>>;

    fn place_order<'a>(
        &'a self,
        order_id: i64,
        contract: ContractSpec,
        ticket: OrderTicket,
    ) -> BrokerFuture<'a, Result<(), GatewayError>>;

    fn open_positions_snapshot<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Vec<OpenPosition>, GatewayError>>;
}

impl<G: SessionGateway + ?Sized> SessionGateway for Arc<G> {
    fn next_order_id<'a>(&'a self) -> BrokerFuture<'a, Result<i64, GatewayError>> {
        (**self).next_order_id()
    }

    fn place_order<'a>(
        &'a self,
        order_id: i64,
        contract: ContractSpec,
        ticket: OrderTicket,
    ) -> BrokerFuture<'a, Result<(), GatewayError>> {
        (**self).place_order(order_id, contract, ticket)
    }

    fn open_positions_snapshot<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Vec<OpenPosition>, GatewayError>> {
        (**self).open_positions_snapshot()
    }
}

/// Chinese-market broker driving a [`SessionGateway`].
///
/// Market hours come from an [`OpenWindow`] predicate; the gateway has no
/// calendar, so the next open time is never known.
pub struct SessionBroker<G> {
    gateway: G,
    window: Box<dyn OpenWindow>,
    clock: Arc<dyn Clock>,
}

impl<G: SessionGateway> SessionBroker<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            window: Box::new(UtcSessionWindow::china_a_shares()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_window(mut self, window: impl OpenWindow + 'static) -> Self {
        self.window = Box::new(window);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn send(&self, instrument: &Instrument, ticket: OrderTicket) -> OrderResult {
        if !(ticket.total_quantity > 0.0) {
            return OrderResult::rejected("quantity must be > 0");
        }
        if let Some(price) = ticket.lmt_price.filter(|price| !(*price > 0.0)) {
            return OrderResult::rejected(format!("limit price must be > 0, got {price}"));
        }
        if let Some(price) = ticket.aux_price.filter(|price| !(*price > 0.0)) {
            return OrderResult::rejected(format!("stop price must be > 0, got {price}"));
        }

        let contract = ContractSpec::from_instrument(instrument);
        let order_id = match self.gateway.next_order_id().await {
            Ok(order_id) => order_id,
            Err(error) => return send_failed(&contract, &error),
        };

        match self.gateway.place_order(order_id, contract.clone(), ticket).await {
            Ok(()) => {
                debug!(symbol = %contract.symbol, order_id, "ticket handed to session gateway");
                OrderResult::accepted(
                    Some(BrokerOrderId::from(order_id)),
                    "order sent to gateway; acceptance and fills are reported asynchronously",
                )
            }
            Err(error) => send_failed(&contract, &error),
        }
    }
}

fn send_failed(contract: &ContractSpec, error: &GatewayError) -> OrderResult {
    warn!(symbol = %contract.symbol, error = error.message(), "session gateway refused ticket");
    OrderResult::rejected(format!("failed to send order: {error}"))
}

impl<G: SessionGateway> Broker for SessionBroker<G> {
    fn name(&self) -> &str {
        "cn-session"
    }

    fn place_market_order<'a>(
        &'a self,
        order: MarketOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let ticket = OrderTicket::new(
                order.side.into(),
                TicketType::Market,
                order.quantity,
                order.time_in_force,
            );
            Ok(self.send(&order.instrument, ticket).await)
        })
    }

    fn place_limit_order<'a>(
        &'a self,
        order: LimitOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let mut ticket = OrderTicket::new(
                order.side.into(),
                TicketType::Limit,
                order.quantity,
                order.time_in_force,
            );
            ticket.lmt_price = Some(order.limit_price);
            Ok(self.send(&order.instrument, ticket).await)
        })
    }

    fn place_stop_order<'a>(
        &'a self,
        order: StopOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let mut ticket = OrderTicket::new(
                order.side.into(),
                TicketType::Stop,
                order.quantity,
                order.time_in_force,
            );
            ticket.aux_price = Some(order.stop_price);
            Ok(self.send(&order.instrument, ticket).await)
        })
    }

    fn place_short_order<'a>(
        &'a self,
        order: ShortOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let ticket = OrderTicket::new(
                TicketAction::Sell,
                TicketType::Market,
                order.quantity,
                order.time_in_force,
            );
            Ok(self.send(&order.instrument, ticket).await)
        })
    }

    fn open_positions<'a>(&'a self) -> BrokerFuture<'a, Result<Vec<OpenPosition>, BrokerError>> {
        Box::pin(async move {
            self.gateway
                .open_positions_snapshot()
                .await
                .map_err(|error| BrokerError::unavailable(format!("session gateway: {error}")))
        })
    }

    fn is_market_open<'a>(&'a self) -> BrokerFuture<'a, Result<bool, BrokerError>> {
        Box::pin(async move { Ok(self.window.is_open(self.clock.now())) })
    }

    fn next_market_open_time<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Option<UtcDateTime>, BrokerError>> {
        Box::pin(async move { Ok(None) })
    }
}

/// Ticket accepted by the in-memory gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTicket {
    pub order_id: i64,
    pub contract: ContractSpec,
    pub ticket: OrderTicket,
}

#[derive(Debug, Default)]
struct PaperBook {
    last_order_id: i64,
    placed: Vec<PlacedTicket>,
    positions: Vec<OpenPosition>,
    order_failure: Option<String>,
    snapshot_failure: Option<String>,
}

/// Paper gateway: allocates ids, records tickets and serves a fixed book.
#[derive(Debug, Default)]
pub struct InMemorySessionGateway {
    book: Mutex<PaperBook>,
}

impl InMemorySessionGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(positions: Vec<OpenPosition>) -> Self {
        let gateway = Self::new();
        gateway.lock().positions = positions;
        gateway
    }

    /// Every later `place_order` fails with `message`.
    pub fn fail_orders(&self, message: impl Into<String>) {
        self.lock().order_failure = Some(message.into());
    }

    /// Every later snapshot request fails with `message`.
    pub fn fail_snapshots(&self, message: impl Into<String>) {
        self.lock().snapshot_failure = Some(message.into());
    }

    pub fn placed(&self) -> Vec<PlacedTicket> {
        self.lock().placed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PaperBook> {
        self.book.lock().expect("paper book lock is not poisoned")
    }
}

impl SessionGateway for InMemorySessionGateway {
    fn next_order_id<'a>(&'a self) -> BrokerFuture<'a, Result<i64, GatewayError>> {
        let mut book = self.lock();
        book.last_order_id += 1;
        let order_id = book.last_order_id;
        Box::pin(async move { Ok(order_id) })
    }

    fn place_order<'a>(
        &'a self,
        order_id: i64,
        contract: ContractSpec,
        ticket: OrderTicket,
    ) -> BrokerFuture<'a, Result<(), GatewayError>> {
        let mut book = self.lock();
        let outcome = match &book.order_failure {
            Some(message) => Err(GatewayError::new(message.clone())),
            None => {
                book.placed.push(PlacedTicket {
                    order_id,
                    contract,
                    ticket,
                });
                Ok(())
            }
        };
        Box::pin(async move { outcome })
    }

    fn open_positions_snapshot<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Vec<OpenPosition>, GatewayError>> {
        let book = self.lock();
        let outcome = match &book.snapshot_failure {
            Some(message) => Err(GatewayError::new(message.clone())),
            None => Ok(book.positions.clone()),
        };
        Box::pin(async move { outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, NeverOpen};

    fn broker() -> SessionBroker<Arc<InMemorySessionGateway>> {
        SessionBroker::new(Arc::new(InMemorySessionGateway::new()))
    }

    #[tokio::test]
    async fn market_order_becomes_mkt_ticket() {
        let broker = broker();
        let instrument = Instrument::stock("600519")
            .with_exchange("SSE")
            .with_currency("CNY");

        let result = broker
            .place_market_order(MarketOrder::new(instrument, Side::Buy, 100.0))
            .await
            .expect("gateway reachable");
        assert!(result.is_accepted());
        assert_eq!(result.broker_order_id().map(BrokerOrderId::as_str), Some("1"));

        let placed = broker.gateway().placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].ticket.action, TicketAction::Buy);
        assert_eq!(placed[0].ticket.order_type, TicketType::Market);
        assert_eq!(placed[0].ticket.tif, "DAY");
        assert_eq!(placed[0].contract.exchange.as_deref(), Some("SSE"));
        assert!(placed[0].contract.contract_month.is_none());
    }

    #[tokio::test]
    async fn stop_price_travels_as_aux_price() {
        let broker = broker();
        let order = StopOrder::new(Instrument::stock("000001"), Side::Sell, 200.0, 10.5)
            .with_time_in_force(TimeInForce::GoodTillCanceled);

        broker.place_stop_order(order).await.expect("gateway reachable");

        let ticket = &broker.gateway().placed()[0].ticket;
        assert_eq!(ticket.order_type, TicketType::Stop);
        assert_eq!(ticket.aux_price, Some(10.5));
        assert_eq!(ticket.lmt_price, None);
        assert_eq!(ticket.tif, "GTC");
    }

    #[tokio::test]
    async fn short_order_is_a_market_sell() {
        let broker = broker();
        broker
            .place_short_order(ShortOrder::new(Instrument::stock("000001"), 100.0))
            .await
            .expect("gateway reachable");

        let ticket = &broker.gateway().placed()[0].ticket;
        assert_eq!(ticket.action, TicketAction::Sell);
        assert_eq!(ticket.order_type, TicketType::Market);
    }

    #[tokio::test]
    async fn non_positive_prices_are_rejected_before_the_gateway() {
        let broker = broker();
        let order = LimitOrder::new(Instrument::stock("000001"), Side::Buy, 100.0, 0.0);

        let result = broker.place_limit_order(order).await.expect("gateway reachable");
        assert!(!result.is_accepted());
        assert!(broker.gateway().placed().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_a_rejection_not_an_error() {
        let broker = broker();
        broker.gateway().fail_orders("socket closed");

        let result = broker
            .place_market_order(MarketOrder::new(Instrument::stock("000001"), Side::Buy, 1.0))
            .await
            .expect("no transport error");
        assert!(!result.is_accepted());
        assert_eq!(result.message(), "failed to send order: socket closed");
    }

    #[test]
    fn future_contracts_keep_month_and_optional_fields() {
        let instrument = Instrument::future("IF", "202606")
            .with_exchange("CFFEX")
            .with_trading_class(" ")
            .with_multiplier("300");

        let contract = ContractSpec::from_instrument(&instrument);
        assert_eq!(contract.contract_month.as_deref(), Some("202606"));
        assert_eq!(contract.trading_class, None);
        assert_eq!(contract.multiplier.as_deref(), Some("300"));

        let stock = ContractSpec::from_instrument(&Instrument::stock("600519").with_multiplier("1"));
        assert_eq!(stock.multiplier, None);
    }

    #[tokio::test]
    async fn close_all_sweeps_gateway_snapshot() {
        let gateway = Arc::new(InMemorySessionGateway::with_positions(vec![
            OpenPosition::new(Instrument::stock("600519"), 300.0, 1_650.0),
            OpenPosition::new(Instrument::future("IF", "202606"), -2.0, 3_900.0),
            OpenPosition::new(Instrument::stock("000001"), 0.0, 11.0),
        ]));
        let broker = SessionBroker::new(gateway.clone());

        let result = broker.close_all_positions().await;
        assert!(result.success);
        assert_eq!(result.orders_sent, 2);

        let placed = gateway.placed();
        assert_eq!(placed[0].ticket.action, TicketAction::Sell);
        assert_eq!(placed[0].ticket.total_quantity, 300.0);
        assert_eq!(placed[1].ticket.action, TicketAction::Buy);
        assert_eq!(placed[1].ticket.total_quantity, 2.0);
        assert_eq!(placed[1].contract.contract_month.as_deref(), Some("202606"));
    }

    #[tokio::test]
    async fn market_hours_follow_the_window() {
        let clock = Arc::new(FixedClock::new(
            UtcDateTime::parse("2026-03-02T02:00:00Z").expect("valid timestamp"),
        ));
        let broker = broker().with_clock(clock.clone());
        assert!(broker.is_market_open().await.expect("no transport"));

        clock.set(UtcDateTime::parse("2026-03-02T04:00:00Z").expect("valid timestamp"));
        assert!(!broker.is_market_open().await.expect("no transport"));
        assert_eq!(broker.next_market_open_time().await.expect("no transport"), None);

        let closed = broker.with_window(NeverOpen);
        clock.set(UtcDateTime::parse("2026-03-02T02:00:00Z").expect("valid timestamp"));
        assert!(!closed.is_market_open().await.expect("no transport"));
    }
}
