//! Market-session live loop.
//!
//! Each cycle walks `Idle -> SelectingMarket -> FetchingSample -> Sleeping`
//! and emits one [`CycleReport`]. Cycles never overlap and no failure ends
//! the loop; the next cycle is the only recovery. The loop stops when its
//! [`Shutdown`] fires, checked at the top of every cycle and raced against
//! every broker call and the pacing sleep.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::session_data::{first_interval_sample, Sample, SessionData};
use crate::window::OpenWindow;
use crate::{Broker, Clock, Market, MarketSession, Timeframe, UtcDateTime};

/// Pacing and proxy-instrument settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveLoopConfig {
    /// Pause between cycles; bounds the request rate against the broker.
    pub interval: Duration,
    pub primary_symbol: String,
    pub secondary_symbol: String,
    pub timeframe: Timeframe,
}

impl Default for LiveLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            primary_symbol: String::from("SPY"),
            secondary_symbol: String::from("SSE"),
            timeframe: Timeframe::FiveMinutes,
        }
    }
}

/// Loop phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    SelectingMarket,
    FetchingSample,
    Sleeping,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectingMarket => "selecting_market",
            Self::FetchingSample => "fetching_sample",
            Self::Sleeping => "sleeping",
        }
    }
}

/// Market whose open state comes from a wall-clock predicate.
pub struct SecondaryMarket {
    pub market: Market,
    pub window: Box<dyn OpenWindow>,
    /// Bar source for the sample; `None` yields a not-ok sample.
    pub data: Option<Arc<dyn SessionData>>,
}

impl SecondaryMarket {
    pub fn new(market: Market, window: impl OpenWindow + 'static) -> Self {
        Self {
            market,
            window: Box::new(window),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Arc<dyn SessionData>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Operator-visible result of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    NoMarketOpen,
    SampleOk,
    SampleFailed,
}

/// Observation emitted once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub at: UtcDateTime,
    pub session: MarketSession,
    pub timeframe: Timeframe,
    pub sample: Option<Sample>,
}

impl CycleReport {
    pub fn outcome(&self) -> CycleOutcome {
        match &self.sample {
            None => CycleOutcome::NoMarketOpen,
            Some(sample) if sample.ok => CycleOutcome::SampleOk,
            Some(_) => CycleOutcome::SampleFailed,
        }
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.session, &self.sample) {
            (MarketSession::Open { market, proxy_symbol }, Some(sample)) => write!(
                f,
                "[UTC {}] {} open. First {} candle ({}): {}\n{}",
                self.at,
                market,
                self.timeframe,
                proxy_symbol,
                if sample.ok { "OK" } else { "FAIL" },
                sample.raw
            ),
            _ => write!(f, "[UTC {}] No tracked market open.", self.at),
        }
    }
}

/// Fires the loop's shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// Cooperative cancellation observed by the loop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once fired; pends forever if the trigger is dropped unfired.
    pub async fn fired(&mut self) {
        let trigger_dropped = self.rx.wait_for(|fired| *fired).await.is_err();
        if trigger_dropped {
            std::future::pending::<()>().await;
        }
    }
}

/// How a [`LiveLoop::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub cancelled: bool,
}

/// Scheduler bound to a primary adapter with a broker clock and bar data.
pub struct LiveLoop<P> {
    primary: P,
    secondary: Option<SecondaryMarket>,
    clock: Arc<dyn Clock>,
    config: LiveLoopConfig,
}

impl<P> LiveLoop<P>
where
    P: Broker + SessionData,
{
    pub fn new(primary: P, clock: Arc<dyn Clock>, config: LiveLoopConfig) -> Self {
        Self {
            primary,
            secondary: None,
            clock,
            config,
        }
    }

    pub fn with_secondary(mut self, secondary: SecondaryMarket) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn config(&self) -> &LiveLoopConfig {
        &self.config
    }

    /// Picks the market to track right now.
    ///
    /// The primary adapter's clock wins; a failed clock query counts as
    /// closed for this cycle. The secondary predicate needs no network.
    pub async fn select_market(&self) -> MarketSession {
        match self.primary.is_market_open().await {
            Ok(true) => return MarketSession::open(Market::Us, &self.config.primary_symbol),
            Ok(false) => {}
            Err(error) => {
                warn!(broker = self.primary.name(), %error, "market clock query failed");
            }
        }

        match &self.secondary {
            Some(secondary) if secondary.window.is_open(self.clock.now()) => {
                MarketSession::open(secondary.market, &self.config.secondary_symbol)
            }
            _ => MarketSession::None,
        }
    }

    async fn fetch_sample(&self, session: &MarketSession) -> Option<Sample> {
        let MarketSession::Open {
            market,
            proxy_symbol,
        } = session
        else {
            return None;
        };

        let timeframe = self.config.timeframe;
        let sample = if *market == Market::Us {
            first_interval_sample(&self.primary, self.clock.as_ref(), proxy_symbol, timeframe).await
        } else {
            match self.secondary.as_ref().and_then(|s| s.data.as_ref()) {
                Some(data) => {
                    first_interval_sample(data.as_ref(), self.clock.as_ref(), proxy_symbol, timeframe)
                        .await
                }
                None => Sample::failed(format!("{market} market data source is not configured")),
            }
        };
        Some(sample)
    }

    /// One full select-and-fetch pass, without the pacing sleep.
    pub async fn run_cycle(&self) -> CycleReport {
        let at = self.clock.now();
        trace_phase(Phase::SelectingMarket);
        let session = self.select_market().await;

        if session.market().is_some() {
            trace_phase(Phase::FetchingSample);
        }
        let sample = self.fetch_sample(&session).await;

        let report = CycleReport {
            at,
            session,
            timeframe: self.config.timeframe,
            sample,
        };
        info!(
            at = %report.at,
            market = report.session.market().map(Market::as_str).unwrap_or("none"),
            symbol = report.session.proxy_symbol().unwrap_or(""),
            outcome = ?report.outcome(),
            "live loop cycle"
        );
        report
    }

    /// Runs cycles until `shutdown` fires or `max_cycles` is reached.
    pub async fn run<F>(
        &self,
        mut shutdown: Shutdown,
        max_cycles: Option<u64>,
        mut observe: F,
    ) -> LoopSummary
    where
        F: FnMut(&CycleReport) + Send,
    {
        let mut cycles = 0_u64;
        loop {
            trace_phase(Phase::Idle);
            if max_cycles.is_some_and(|max| cycles >= max) {
                return LoopSummary {
                    cycles,
                    cancelled: false,
                };
            }
            if shutdown.is_fired() {
                return LoopSummary {
                    cycles,
                    cancelled: true,
                };
            }

            let report = tokio::select! {
                report = self.run_cycle() => report,
                _ = shutdown.fired() => {
                    info!("live loop cancelled mid-cycle");
                    return LoopSummary { cycles, cancelled: true };
                }
            };
            cycles += 1;
            observe(&report);

            if max_cycles.is_some_and(|max| cycles >= max) {
                continue;
            }

            trace_phase(Phase::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.fired() => {
                    info!("live loop cancelled while sleeping");
                    return LoopSummary { cycles, cancelled: true };
                }
            }
        }
    }
}

fn trace_phase(phase: Phase) {
    debug!(phase = phase.as_str(), "live loop phase");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> UtcDateTime {
        UtcDateTime::parse(value).expect("valid timestamp")
    }

    #[test]
    fn no_market_report_renders_single_line() {
        let report = CycleReport {
            at: at("2026-03-02T12:00:00Z"),
            session: MarketSession::None,
            timeframe: Timeframe::FiveMinutes,
            sample: None,
        };
        assert_eq!(report.to_string(), "[UTC 2026-03-02T12:00:00Z] No tracked market open.");
        assert_eq!(report.outcome(), CycleOutcome::NoMarketOpen);
    }

    #[test]
    fn failed_sample_report_shows_diagnostic() {
        let report = CycleReport {
            at: at("2026-03-02T15:00:00Z"),
            session: MarketSession::open(Market::Us, "SPY"),
            timeframe: Timeframe::FiveMinutes,
            sample: Some(Sample::failed("calendar failed: 503")),
        };
        assert_eq!(
            report.to_string(),
            "[UTC 2026-03-02T15:00:00Z] US open. First 5m candle (SPY): FAIL\ncalendar failed: 503"
        );
        assert_eq!(report.outcome(), CycleOutcome::SampleFailed);
    }

    #[tokio::test]
    async fn fired_shutdown_is_observed() {
        let (trigger, mut shutdown) = Shutdown::channel();
        assert!(!shutdown.is_fired());
        trigger.fire();
        shutdown.fired().await;
        assert!(shutdown.is_fired());
    }
}
