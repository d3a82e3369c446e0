use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time, UtcOffset, Weekday};

use crate::ValidationError;

/// Instant normalized to UTC; renders as RFC3339 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC3339 timestamp in any offset and converts it to UTC.
    ///
    /// Broker clocks report exchange-local offsets (`-04:00` for New York).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed =
            OffsetDateTime::parse(input.trim(), &Rfc3339).map_err(|_| {
                ValidationError::TimestampNotUtc {
                    value: input.to_owned(),
                }
            })?;
        Ok(Self(parsed.to_offset(UtcOffset::UTC)))
    }

    pub fn date(self) -> Date {
        self.0.date()
    }

    pub fn time(self) -> Time {
        self.0.time()
    }

    pub fn weekday(self) -> Weekday {
        self.0.weekday()
    }

    /// Midnight UTC of the same calendar day.
    pub fn start_of_day(self) -> Self {
        Self(self.0.replace_time(Time::MIDNIGHT))
    }

    /// Second-precision RFC3339 form, e.g. `2026-03-02T14:30:00Z`.
    pub fn format_rfc3339(self) -> String {
        let truncated = self
            .0
            .replace_nanosecond(0)
            .unwrap_or(self.0);
        truncated
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
