//! # Tradebridge Core
//!
//! Broker-neutral order placement, position flattening and market-session
//! scheduling.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Order intents, verdicts, positions, bars and timestamps |
//! | [`broker`] | [`Broker`] capability trait and [`BrokerError`] |
//! | [`dispatch`] | Argument validation and forwarding to one adapter |
//! | [`sweep`] | Close-all sweep over a position snapshot |
//! | [`session_data`] | Calendar and first-interval bar sampling |
//! | [`scheduler`] | Cancellable live loop choosing the tracked market |
//! | [`window`] | Wall-clock open/closed predicates |
//! | [`adapters`] | Alpaca REST and CN session-gateway brokers |
//!
//! Adapters are picked at runtime through `Arc<dyn Broker>`; the dispatcher
//! and the sweep are generic over any [`Broker`].

pub mod adapters;
pub mod broker;
pub mod clock;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod scheduler;
pub mod session_data;
pub mod sweep;
pub mod throttling;
pub mod window;

pub use adapters::{
    AlpacaBroker, AlpacaConfig, AlpacaConfigError, ContractSpec, GatewayError,
    InMemorySessionGateway, OrderTicket, SessionBroker, SessionGateway,
};
pub use broker::{Broker, BrokerError, BrokerErrorKind, BrokerFuture};
pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatch::OrderDispatcher;
pub use domain::{
    Bar, BrokerOrderId, Instrument, LimitOrder, Market, MarketOrder, MarketSession,
    OpenPosition, OrderIntent, OrderResult, PositionCloseResult, SecurityType, ShortOrder, Side,
    StopOrder, TimeInForce, Timeframe, UtcDateTime,
};
pub use error::{DispatchError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use scheduler::{
    CycleOutcome, CycleReport, LiveLoop, LiveLoopConfig, LoopSummary, SecondaryMarket, Shutdown,
    ShutdownTrigger,
};
pub use session_data::{ApiReply, BarsReply, IntradayBarsRequest, Sample, SessionData};
pub use throttling::RequestBudget;
pub use window::{NeverOpen, OpenWindow, UtcRange, UtcSessionWindow};
