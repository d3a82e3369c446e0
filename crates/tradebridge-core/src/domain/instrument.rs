use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Security type codes as understood by session-style brokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    #[serde(rename = "STK")]
    Stock,
    #[serde(rename = "ETF")]
    Etf,
    #[serde(rename = "FUT")]
    Future,
    #[serde(rename = "IND")]
    Index,
    #[serde(rename = "OPT")]
    Option,
    #[serde(rename = "CASH")]
    Cash,
}

impl SecurityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "STK",
            Self::Etf => "ETF",
            Self::Future => "FUT",
            Self::Index => "IND",
            Self::Option => "OPT",
            Self::Cash => "CASH",
        }
    }
}

impl Display for SecurityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "STK" => Ok(Self::Stock),
            "ETF" => Ok(Self::Etf),
            "FUT" => Ok(Self::Future),
            "IND" => Ok(Self::Index),
            "OPT" => Ok(Self::Option),
            "CASH" => Ok(Self::Cash),
            other => Err(ValidationError::InvalidSecurityType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Tradable instrument description.
///
/// Broker-specific fields (`trading_class`, `multiplier`) are carried as-is;
/// adapters that do not use them must still leave them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub sec_type: SecurityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// `YYYYMM` or `YYYYMMDD`; required for futures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trading_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<String>,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, sec_type: SecurityType) -> Self {
        Self {
            symbol: symbol.into(),
            sec_type,
            exchange: None,
            currency: None,
            contract_month: None,
            trading_class: None,
            multiplier: None,
        }
    }

    /// US-style equity routed by symbol alone.
    pub fn stock(symbol: impl Into<String>) -> Self {
        Self::new(symbol, SecurityType::Stock)
    }

    pub fn future(symbol: impl Into<String>, contract_month: impl Into<String>) -> Self {
        Self {
            contract_month: Some(contract_month.into()),
            ..Self::new(symbol, SecurityType::Future)
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_trading_class(mut self, trading_class: impl Into<String>) -> Self {
        self.trading_class = Some(trading_class.into());
        self
    }

    pub fn with_multiplier(mut self, multiplier: impl Into<String>) -> Self {
        self.multiplier = Some(multiplier.into());
        self
    }

    /// Checks the instrument-level invariants: non-empty symbol and a
    /// contract month on futures.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        if self.sec_type == SecurityType::Future
            && self
                .contract_month
                .as_deref()
                .map_or(true, |month| month.trim().is_empty())
        {
            return Err(ValidationError::MissingContractMonth {
                symbol: self.symbol.clone(),
            });
        }

        Ok(())
    }
}
