use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Instrument, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(ValidationError::InvalidSide {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    #[default]
    Day,
    GoodTillCanceled,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    /// Short lowercase code (`day`, `gtc`, `ioc`, `fok`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::GoodTillCanceled => "gtc",
            Self::ImmediateOrCancel => "ioc",
            Self::FillOrKill => "fok",
        }
    }
}

impl Display for TimeInForce {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TimeInForce {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "gtc" => Ok(Self::GoodTillCanceled),
            "ioc" => Ok(Self::ImmediateOrCancel),
            "fok" => Ok(Self::FillOrKill),
            other => Err(ValidationError::InvalidTimeInForce {
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub instrument: Instrument,
    pub side: Side,
    pub quantity: f64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl MarketOrder {
    pub fn new(instrument: Instrument, side: Side, quantity: f64) -> Self {
        Self {
            instrument,
            side,
            quantity,
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub instrument: Instrument,
    pub side: Side,
    pub quantity: f64,
    pub limit_price: f64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl LimitOrder {
    pub fn new(instrument: Instrument, side: Side, quantity: f64, limit_price: f64) -> Self {
        Self {
            instrument,
            side,
            quantity,
            limit_price,
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopOrder {
    pub instrument: Instrument,
    pub side: Side,
    pub quantity: f64,
    pub stop_price: f64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl StopOrder {
    pub fn new(instrument: Instrument, side: Side, quantity: f64, stop_price: f64) -> Self {
        Self {
            instrument,
            side,
            quantity,
            stop_price,
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

/// Sell without an ownership precondition; shortability is checked broker-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortOrder {
    pub instrument: Instrument,
    pub quantity: f64,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl ShortOrder {
    pub fn new(instrument: Instrument, quantity: f64) -> Self {
        Self {
            instrument,
            quantity,
            time_in_force: TimeInForce::Day,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

/// Any order intent the dispatch layer accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderIntent {
    Market(MarketOrder),
    Limit(LimitOrder),
    Stop(StopOrder),
    Short(ShortOrder),
}

impl OrderIntent {
    pub fn instrument(&self) -> &Instrument {
        match self {
            Self::Market(order) => &order.instrument,
            Self::Limit(order) => &order.instrument,
            Self::Stop(order) => &order.instrument,
            Self::Short(order) => &order.instrument,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            Self::Market(order) => order.quantity,
            Self::Limit(order) => order.quantity,
            Self::Stop(order) => order.quantity,
            Self::Short(order) => order.quantity,
        }
    }

    /// Effective side; a short is a sell.
    pub fn side(&self) -> Side {
        match self {
            Self::Market(order) => order.side,
            Self::Limit(order) => order.side,
            Self::Stop(order) => order.side,
            Self::Short(_) => Side::Sell,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Market(_) => "market",
            Self::Limit(_) => "limit",
            Self::Stop(_) => "stop",
            Self::Short(_) => "short",
        }
    }
}

impl From<MarketOrder> for OrderIntent {
    fn from(value: MarketOrder) -> Self {
        Self::Market(value)
    }
}

impl From<LimitOrder> for OrderIntent {
    fn from(value: LimitOrder) -> Self {
        Self::Limit(value)
    }
}

impl From<StopOrder> for OrderIntent {
    fn from(value: StopOrder) -> Self {
        Self::Stop(value)
    }
}

impl From<ShortOrder> for OrderIntent {
    fn from(value: ShortOrder) -> Self {
        Self::Short(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_intent_reports_sell_side() {
        let intent = OrderIntent::from(ShortOrder::new(Instrument::stock("TSLA"), 3.0));
        assert_eq!(intent.side(), Side::Sell);
        assert_eq!(intent.kind(), "short");
    }

    #[test]
    fn time_in_force_parses_short_codes() {
        assert_eq!("GTC".parse::<TimeInForce>(), Ok(TimeInForce::GoodTillCanceled));
        assert_eq!(TimeInForce::default(), TimeInForce::Day);
        assert!("week".parse::<TimeInForce>().is_err());
    }
}
