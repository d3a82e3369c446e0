use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Markets the live loop tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Us,
    Cn,
}

impl Market {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Cn => "CN",
        }
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "us" => Ok(Self::Us),
            "cn" => Ok(Self::Cn),
            other => Err(ValidationError::InvalidMarket {
                value: other.to_owned(),
            }),
        }
    }
}

/// Market chosen for one scheduler cycle, with its proxy instrument.
///
/// Recomputed every cycle; `None` when no tracked market is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MarketSession {
    Open { market: Market, proxy_symbol: String },
    None,
}

impl MarketSession {
    pub fn open(market: Market, proxy_symbol: impl Into<String>) -> Self {
        Self::Open {
            market,
            proxy_symbol: proxy_symbol.into(),
        }
    }

    pub fn market(&self) -> Option<Market> {
        match self {
            Self::Open { market, .. } => Some(*market),
            Self::None => None,
        }
    }

    pub fn proxy_symbol(&self) -> Option<&str> {
        match self {
            Self::Open { proxy_symbol, .. } => Some(proxy_symbol),
            Self::None => None,
        }
    }
}
