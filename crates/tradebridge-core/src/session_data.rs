//! Session calendar and intraday bar retrieval for a market's first sample.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::broker::BrokerFuture;
use crate::{Bar, BrokerError, Clock, Timeframe, UtcDateTime};

/// Raw broker reply: status code plus undecoded payload for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Bars endpoint reply with whatever bars the adapter could decode.
#[derive(Debug, Clone, PartialEq)]
pub struct BarsReply {
    pub reply: ApiReply,
    pub bars: Vec<Bar>,
}

/// Request for the earliest bars of a symbol after `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradayBarsRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start: UtcDateTime,
    pub limit: usize,
}

/// Market data capabilities needed by the live loop.
pub trait SessionData: Send + Sync {
    /// Calendar entry for `date`, as returned by the broker.
    fn session_calendar<'a>(&'a self, date: Date) -> BrokerFuture<'a, Result<ApiReply, BrokerError>>;

    fn intraday_bars<'a>(
        &'a self,
        request: IntradayBarsRequest,
    ) -> BrokerFuture<'a, Result<BarsReply, BrokerError>>;
}

impl<D: SessionData + ?Sized> SessionData for Arc<D> {
    fn session_calendar<'a>(&'a self, date: Date) -> BrokerFuture<'a, Result<ApiReply, BrokerError>> {
        (**self).session_calendar(date)
    }

    fn intraday_bars<'a>(
        &'a self,
        request: IntradayBarsRequest,
    ) -> BrokerFuture<'a, Result<BarsReply, BrokerError>> {
        (**self).intraday_bars(request)
    }
}

/// First short-interval observation of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ok: bool,
    pub bar: Option<Bar>,
    /// Raw payload or failure diagnostic.
    pub raw: String,
}

impl Sample {
    pub fn failed(raw: impl Into<String>) -> Self {
        Self {
            ok: false,
            bar: None,
            raw: raw.into(),
        }
    }
}

/// Fetches the first `timeframe` bar of today's session for `symbol`.
///
/// Three steps, single attempt each: resolve today's UTC date, resolve the
/// session calendar for that date, then request one bar starting at UTC
/// midnight. The broker only returns bars inside trading hours, so the
/// first bar after midnight is the session's first bar. Any failed step
/// yields a not-ok sample carrying the diagnostic; nothing is retried.
pub async fn first_interval_sample<D>(
    source: &D,
    clock: &dyn Clock,
    symbol: &str,
    timeframe: Timeframe,
) -> Sample
where
    D: SessionData + ?Sized,
{
    let today = clock.now().start_of_day();

    match source.session_calendar(today.date()).await {
        Ok(reply) if reply.is_success() => {}
        Ok(reply) => return Sample::failed(format!("calendar failed: {}", reply.body)),
        Err(error) => return Sample::failed(format!("calendar failed: {error}")),
    }

    let request = IntradayBarsRequest {
        symbol: symbol.to_owned(),
        timeframe,
        start: today,
        limit: 1,
    };

    match source.intraday_bars(request).await {
        Ok(BarsReply { reply, bars }) => Sample {
            ok: reply.is_success(),
            bar: bars.into_iter().next(),
            raw: reply.body,
        },
        Err(error) => Sample::failed(format!("bars failed: {error}")),
    }
}
