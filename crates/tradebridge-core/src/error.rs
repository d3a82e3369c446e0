use thiserror::Error;

use crate::broker::BrokerError;

/// Local validation failures raised before an order reaches any broker.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("quantity must be > 0, got {value}")]
    NonPositiveQuantity { value: f64 },
    #[error("{field} must be > 0, got {value}")]
    NonPositivePrice { field: &'static str, value: f64 },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("future contract '{symbol}' requires a contract month")]
    MissingContractMonth { symbol: String },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 1h")]
    InvalidInterval { value: String },
    #[error("bar high must be >= low")]
    InvalidBarRange,

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("invalid market '{value}', expected one of us, cn")]
    InvalidMarket { value: String },
    #[error("invalid side '{value}', expected buy or sell")]
    InvalidSide { value: String },
    #[error("invalid time in force '{value}', expected one of day, gtc, ioc, fok")]
    InvalidTimeInForce { value: String },
    #[error("invalid security type '{value}', expected one of STK, ETF, FUT, IND, OPT, CASH")]
    InvalidSecurityType { value: String },
}

/// Failure modes of the validation-then-forward dispatch path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] BrokerError),
}

impl DispatchError {
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
