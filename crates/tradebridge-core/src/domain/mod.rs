//! # Domain Models
//!
//! Value types shared by every broker adapter: order intents, broker
//! verdicts, position snapshots and the scheduler's market selection.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Instrument`] | Symbol plus venue and futures fields |
//! | [`MarketOrder`], [`LimitOrder`], [`StopOrder`], [`ShortOrder`] | Order intents |
//! | [`OrderIntent`] | Tagged union of the four intents |
//! | [`OrderResult`] | Accept/reject verdict for one submission |
//! | [`OpenPosition`] | Row of a position snapshot |
//! | [`PositionCloseResult`] | Outcome of a close-all sweep |
//! | [`MarketSession`] | Market selected for a scheduler cycle |
//! | [`Bar`] | OHLCV sample |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Nothing here talks to a broker; the types carry no shared mutable state.

mod bar;
mod instrument;
mod market;
mod order;
mod outcome;
mod timestamp;

pub use bar::{Bar, Timeframe};
pub use instrument::{Instrument, SecurityType};
pub use market::{Market, MarketSession};
pub use order::{
    LimitOrder, MarketOrder, OrderIntent, ShortOrder, Side, StopOrder, TimeInForce,
};
pub use outcome::{BrokerOrderId, OpenPosition, OrderResult, PositionCloseResult};
pub use timestamp::UtcDateTime;
