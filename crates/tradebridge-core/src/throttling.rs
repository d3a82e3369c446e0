use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Client-side request budget for one broker account.
///
/// Calls over budget are refused locally instead of being sent and
/// rejected by the broker with HTTP 429.
#[derive(Clone)]
pub struct RequestBudget {
    limiter: Arc<DirectRateLimiter>,
    window: Duration,
    limit: u32,
}

impl RequestBudget {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_window(window, limit))),
            window,
            limit: limit.max(1),
        }
    }

    /// Alpaca's documented account limit: 200 requests per minute.
    pub fn alpaca_default() -> Self {
        Self::new(Duration::from_secs(60), 200)
    }

    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn describe(&self) -> String {
        format!("{} requests per {}s", self.limit, self.window.as_secs())
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let safe_limit = limit.max(1);
    let burst = NonZeroU32::new(safe_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst)
}
