use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{UtcDateTime, ValidationError};

/// Intraday bar width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
}

impl Timeframe {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
        }
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            other => Err(ValidationError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

/// OHLCV bar starting at `ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        let ts = UtcDateTime::parse("2026-03-02T14:30:00Z").expect("valid ts");
        let err = Bar::new(ts, 10.0, 9.0, 11.0, 10.0, None).expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidBarRange);
    }
}
