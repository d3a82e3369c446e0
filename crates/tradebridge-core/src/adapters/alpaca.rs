use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broker::BrokerFuture;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::session_data::{ApiReply, BarsReply, IntradayBarsRequest, SessionData};
use crate::throttling::RequestBudget;
use crate::{
    Bar, Broker, BrokerError, BrokerOrderId, Instrument, LimitOrder, MarketOrder, OpenPosition,
    OrderResult, PositionCloseResult, ShortOrder, Side, StopOrder, TimeInForce, Timeframe,
    UtcDateTime,
};

pub const API_KEY_ENV: &str = "TRADEBRIDGE_ALPACA_API_KEY";
pub const API_SECRET_ENV: &str = "TRADEBRIDGE_ALPACA_API_SECRET";
pub const TRADING_URL_ENV: &str = "TRADEBRIDGE_ALPACA_TRADING_URL";
pub const DATA_URL_ENV: &str = "TRADEBRIDGE_ALPACA_DATA_URL";

pub const DEFAULT_TRADING_URL: &str = "https://paper-api.alpaca.markets";
pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlpacaConfigError {
    #[error("environment variable {name} is not set")]
    MissingVariable { name: &'static str },
    #[error("alpaca config field '{field}' must not be empty")]
    EmptyField { field: &'static str },
}

/// Credentials and endpoints for one Alpaca account.
#[derive(Clone, PartialEq, Eq)]
pub struct AlpacaConfig {
    api_key: String,
    api_secret: String,
    trading_url: String,
    data_url: String,
    timeout_ms: u64,
}

impl std::fmt::Debug for AlpacaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaConfig")
            .field("api_key", &"<redacted>")
            .field("trading_url", &self.trading_url)
            .field("data_url", &self.data_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl AlpacaConfig {
    /// Paper-trading endpoints with the given credentials.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Result<Self, AlpacaConfigError> {
        let config = Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            trading_url: String::from(DEFAULT_TRADING_URL),
            data_url: String::from(DEFAULT_DATA_URL),
            timeout_ms: 3_000,
        };
        config.validated()
    }

    pub fn from_env() -> Result<Self, AlpacaConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AlpacaConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AlpacaConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name).ok_or(AlpacaConfigError::MissingVariable { name })
        };

        let mut config = Self::new(required(API_KEY_ENV)?, required(API_SECRET_ENV)?)?;
        if let Some(url) = lookup(TRADING_URL_ENV) {
            config = config.with_trading_url(url)?;
        }
        if let Some(url) = lookup(DATA_URL_ENV) {
            config = config.with_data_url(url)?;
        }
        Ok(config)
    }

    pub fn with_trading_url(mut self, url: impl Into<String>) -> Result<Self, AlpacaConfigError> {
        self.trading_url = url.into();
        self.validated()
    }

    pub fn with_data_url(mut self, url: impl Into<String>) -> Result<Self, AlpacaConfigError> {
        self.data_url = url.into();
        self.validated()
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn trading_url(&self) -> &str {
        &self.trading_url
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    fn validated(mut self) -> Result<Self, AlpacaConfigError> {
        for (field, value, is_url) in [
            ("api_key", &mut self.api_key, false),
            ("api_secret", &mut self.api_secret, false),
            ("trading_url", &mut self.trading_url, true),
            ("data_url", &mut self.data_url, true),
        ] {
            let mut trimmed = value.trim();
            if is_url {
                trimmed = trimmed.trim_end_matches('/');
            }
            if trimmed.is_empty() {
                return Err(AlpacaConfigError::EmptyField { field });
            }
            *value = trimmed.to_owned();
        }
        Ok(self)
    }
}

/// Alpaca paper-trading adapter over the REST API.
#[derive(Clone)]
pub struct AlpacaBroker {
    config: AlpacaConfig,
    http_client: Arc<dyn HttpClient>,
    budget: RequestBudget,
}

impl AlpacaBroker {
    pub fn new(config: AlpacaConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: AlpacaConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            budget: RequestBudget::alpaca_default(),
        }
    }

    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn config(&self) -> &AlpacaConfig {
        &self.config
    }

    fn trading(&self, path: &str) -> String {
        format!("{}{path}", self.config.trading_url)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BrokerError> {
        if !self.budget.try_acquire() {
            return Err(BrokerError::rate_limited(format!(
                "alpaca request budget of {} exhausted",
                self.budget.describe()
            )));
        }

        let request = request
            .with_header("APCA-API-KEY-ID", &self.config.api_key)
            .with_header("APCA-API-SECRET-KEY", &self.config.api_secret)
            .with_timeout_ms(self.config.timeout_ms);
        let method = request.method;
        let url = request.url.clone();

        self.http_client.execute(request).await.map_err(|error| {
            warn!(method = method.as_str(), %url, error = error.message(), "alpaca transport error");
            BrokerError::unavailable(format!("alpaca transport error: {}", error.message()))
        })
    }

    /// Sends a request whose non-2xx answer is a transport-level failure.
    async fn fetch_ok(&self, request: HttpRequest, what: &str) -> Result<String, BrokerError> {
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(BrokerError::unavailable(format!(
                "alpaca {what} returned HTTP {} {}",
                response.status, response.body
            )));
        }
        Ok(response.body)
    }

    async fn submit_order(&self, body: OrderBody<'_>) -> Result<OrderResult, BrokerError> {
        let payload = serde_json::to_string(&body)
            .map_err(|error| BrokerError::internal(format!("failed to encode order: {error}")))?;
        let response = self
            .send(HttpRequest::post_json(self.trading("/v2/orders"), payload))
            .await?;

        if !response.is_success() {
            warn!(
                symbol = body.symbol,
                status = response.status,
                "alpaca rejected order"
            );
            return Ok(OrderResult::rejected(format!(
                "order rejected: HTTP {} {}",
                response.status, response.body
            )));
        }

        let order_id = serde_json::from_str::<OrderAck>(&response.body)
            .ok()
            .map(|ack| BrokerOrderId::new(ack.id));
        Ok(OrderResult::accepted(order_id, "order accepted"))
    }

    async fn clock(&self) -> Result<ClockPayload, BrokerError> {
        let body = self
            .fetch_ok(HttpRequest::get(self.trading("/v2/clock")), "clock")
            .await?;
        serde_json::from_str(&body).map_err(|error| {
            BrokerError::malformed_response(format!("alpaca clock payload: {error}"))
        })
    }
}

impl Broker for AlpacaBroker {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn place_market_order<'a>(
        &'a self,
        order: MarketOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let body = OrderBody::new(
                &order.instrument,
                order.side,
                order.quantity,
                "market",
                order.time_in_force,
            );
            self.submit_order(body).await
        })
    }

    fn place_limit_order<'a>(
        &'a self,
        order: LimitOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let mut body = OrderBody::new(
                &order.instrument,
                order.side,
                order.quantity,
                "limit",
                order.time_in_force,
            );
            body.limit_price = Some(decimal(order.limit_price));
            self.submit_order(body).await
        })
    }

    fn place_stop_order<'a>(
        &'a self,
        order: StopOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            let mut body = OrderBody::new(
                &order.instrument,
                order.side,
                order.quantity,
                "stop",
                order.time_in_force,
            );
            body.stop_price = Some(decimal(order.stop_price));
            self.submit_order(body).await
        })
    }

    fn place_short_order<'a>(
        &'a self,
        order: ShortOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        Box::pin(async move {
            // Selling a symbol the account does not hold opens a short.
            let body = OrderBody::new(
                &order.instrument,
                Side::Sell,
                order.quantity,
                "market",
                order.time_in_force,
            );
            self.submit_order(body).await
        })
    }

    fn open_positions<'a>(&'a self) -> BrokerFuture<'a, Result<Vec<OpenPosition>, BrokerError>> {
        Box::pin(async move {
            let body = self
                .fetch_ok(HttpRequest::get(self.trading("/v2/positions")), "positions")
                .await?;
            let rows: Vec<PositionPayload> = serde_json::from_str(&body).map_err(|error| {
                BrokerError::malformed_response(format!("alpaca positions payload: {error}"))
            })?;
            rows.into_iter().map(PositionPayload::normalize).collect()
        })
    }

    /// Native liquidation through `DELETE /v2/positions`.
    fn close_all_positions<'a>(&'a self) -> BrokerFuture<'a, PositionCloseResult> {
        Box::pin(async move {
            let response = match self
                .send(HttpRequest::delete(self.trading("/v2/positions")))
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    return PositionCloseResult::aborted(format!(
                        "close all positions failed: {error}"
                    ))
                }
            };

            if !response.is_success() {
                return PositionCloseResult::aborted(format!(
                    "close all positions failed: HTTP {} {}",
                    response.status, response.body
                ));
            }

            let entries: Vec<LiquidationEntry> = match serde_json::from_str(&response.body) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(%error, "alpaca liquidation body not decoded");
                    return PositionCloseResult {
                        success: true,
                        attempted: 0,
                        orders_sent: 0,
                        order_ids: Vec::new(),
                        message: format!(
                            "close all positions: liquidation requested, reply not decoded: HTTP {} {}",
                            response.status, response.body
                        ),
                    };
                }
            };

            let attempted = entries.len();
            let order_ids: Vec<BrokerOrderId> = entries
                .into_iter()
                .filter(|entry| (200..300).contains(&entry.status))
                .filter_map(|entry| entry.body.and_then(|ack| ack.id).map(BrokerOrderId::new))
                .collect();
            let orders_sent = order_ids.len();

            PositionCloseResult {
                success: true,
                attempted,
                orders_sent,
                order_ids,
                message: format!(
                    "close all positions: broker liquidated {orders_sent} of {attempted} positions"
                ),
            }
        })
    }

    fn is_market_open<'a>(&'a self) -> BrokerFuture<'a, Result<bool, BrokerError>> {
        Box::pin(async move { Ok(self.clock().await?.is_open) })
    }

    fn next_market_open_time<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Option<UtcDateTime>, BrokerError>> {
        Box::pin(async move {
            let Some(next_open) = self.clock().await?.next_open else {
                return Ok(None);
            };
            UtcDateTime::parse(&next_open).map(Some).map_err(|error| {
                BrokerError::malformed_response(format!("alpaca clock next_open: {error}"))
            })
        })
    }
}

impl SessionData for AlpacaBroker {
    fn session_calendar<'a>(&'a self, date: Date) -> BrokerFuture<'a, Result<ApiReply, BrokerError>> {
        Box::pin(async move {
            let day = date.to_string();
            let url = self.trading(&format!("/v2/calendar?start={day}&end={day}"));
            let response = self.send(HttpRequest::get(url)).await?;
            Ok(ApiReply::new(response.status, response.body))
        })
    }

    fn intraday_bars<'a>(
        &'a self,
        request: IntradayBarsRequest,
    ) -> BrokerFuture<'a, Result<BarsReply, BrokerError>> {
        Box::pin(async move {
            let url = format!(
                "{}/v2/stocks/bars?symbols={}&timeframe={}&start={}&limit={}",
                self.config.data_url,
                urlencoding::encode(&request.symbol),
                timeframe_code(request.timeframe),
                urlencoding::encode(&request.start.format_rfc3339()),
                request.limit
            );
            let response = self.send(HttpRequest::get(url)).await?;

            let bars = if response.is_success() {
                decode_bars(&response.body, &request.symbol)
            } else {
                Vec::new()
            };

            Ok(BarsReply {
                reply: ApiReply::new(response.status, response.body),
                bars,
            })
        })
    }
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    symbol: &'a str,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<String>,
    client_order_id: String,
}

impl<'a> OrderBody<'a> {
    fn new(
        instrument: &'a Instrument,
        side: Side,
        quantity: f64,
        order_type: &'static str,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            symbol: &instrument.symbol,
            qty: decimal(quantity),
            side: side.as_str(),
            order_type,
            time_in_force: time_in_force.code(),
            limit_price: None,
            stop_price: None,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderAck {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LiquidationEntry {
    status: u16,
    body: Option<LiquidationAck>,
}

#[derive(Debug, Deserialize)]
struct LiquidationAck {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClockPayload {
    is_open: bool,
    next_open: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PositionPayload {
    symbol: String,
    qty: String,
    side: String,
    avg_entry_price: String,
    #[serde(default)]
    exchange: Option<String>,
}

impl PositionPayload {
    fn normalize(self) -> Result<OpenPosition, BrokerError> {
        let quantity = parse_decimal("qty", &self.qty)?.abs();
        let signed_quantity = if self.side.eq_ignore_ascii_case("short") {
            -quantity
        } else {
            quantity
        };
        let average_cost = parse_decimal("avg_entry_price", &self.avg_entry_price)?;

        let mut instrument = Instrument::stock(self.symbol).with_currency("USD");
        if let Some(exchange) = self.exchange.filter(|value| !value.is_empty()) {
            instrument = instrument.with_exchange(exchange);
        }
        Ok(OpenPosition::new(instrument, signed_quantity, average_cost))
    }
}

#[derive(Debug, Deserialize)]
struct BarsPayload {
    #[serde(default)]
    bars: std::collections::HashMap<String, Vec<BarPayload>>,
}

#[derive(Debug, Deserialize)]
struct BarPayload {
    t: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: Option<u64>,
}

fn decode_bars(body: &str, symbol: &str) -> Vec<Bar> {
    let payload = match serde_json::from_str::<BarsPayload>(body) {
        Ok(payload) => payload,
        Err(error) => {
            debug!(%error, "alpaca bars body not decoded");
            return Vec::new();
        }
    };

    payload
        .bars
        .get(symbol)
        .into_iter()
        .flatten()
        .filter_map(|raw| {
            let ts = UtcDateTime::parse(&raw.t).ok()?;
            Bar::new(ts, raw.o, raw.h, raw.l, raw.c, raw.v).ok()
        })
        .collect()
}

fn timeframe_code(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::OneMinute => "1Min",
        Timeframe::FiveMinutes => "5Min",
        Timeframe::FifteenMinutes => "15Min",
        Timeframe::OneHour => "1Hour",
    }
}

fn decimal(value: f64) -> String {
    value.to_string()
}

fn parse_decimal(field: &str, value: &str) -> Result<f64, BrokerError> {
    value.trim().parse::<f64>().map_err(|_| {
        BrokerError::malformed_response(format!("alpaca field '{field}' is not a number: {value}"))
    })
}
