//! Broker capability contract.
//!
//! Every adapter implements [`Broker`]. Order placement is synchronous from
//! the caller's point of view: the returned future resolves once the broker
//! has accepted or rejected the request. Fills happen later, broker-side,
//! and are not surfaced here.
//!
//! Business rejections (insufficient funds, symbol not shortable, market
//! closed) come back as `Ok(OrderResult)` with `is_accepted() == false`.
//! Only transport-level failures are reported as [`BrokerError`].

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::sweep;
use crate::{
    LimitOrder, MarketOrder, OpenPosition, OrderResult, PositionCloseResult, ShortOrder,
    StopOrder, UtcDateTime,
};

/// Boxed future returned by adapter calls.
pub type BrokerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport-level failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    /// Broker unreachable or answered with a server-side failure.
    Unavailable,
    /// Local request budget exhausted before the call was made.
    RateLimited,
    /// Broker answered but the payload could not be decoded.
    MalformedResponse,
    Internal,
}

/// Structured transport error raised by adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError {
    kind: BrokerErrorKind,
    message: String,
    retryable: bool,
}

impl BrokerError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::MalformedResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: BrokerErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> BrokerErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            BrokerErrorKind::Unavailable => "broker.unavailable",
            BrokerErrorKind::RateLimited => "broker.rate_limited",
            BrokerErrorKind::MalformedResponse => "broker.malformed_response",
            BrokerErrorKind::Internal => "broker.internal",
        }
    }
}

impl Display for BrokerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for BrokerError {}

/// Capability contract implemented by each broker adapter.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`place_market_order`](Broker::place_market_order) | Market order |
/// | [`place_limit_order`](Broker::place_limit_order) | Limit order |
/// | [`place_stop_order`](Broker::place_stop_order) | Stop order |
/// | [`place_short_order`](Broker::place_short_order) | Sell without ownership check |
/// | [`open_positions`](Broker::open_positions) | Point-in-time position snapshot |
/// | [`close_all_positions`](Broker::close_all_positions) | Flatten every position |
/// | [`is_market_open`](Broker::is_market_open) | Broker clock query |
/// | [`next_market_open_time`](Broker::next_market_open_time) | Next session open, if known |
///
/// Adapters are not required to be safe for concurrent calls on one
/// instance; callers that share one across tasks serialize access.
pub trait Broker: Send + Sync {
    /// Short adapter name used in logs.
    fn name(&self) -> &str;

    fn place_market_order<'a>(
        &'a self,
        order: MarketOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>>;

    fn place_limit_order<'a>(
        &'a self,
        order: LimitOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>>;

    fn place_stop_order<'a>(
        &'a self,
        order: StopOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>>;

    fn place_short_order<'a>(
        &'a self,
        order: ShortOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>>;

    fn open_positions<'a>(&'a self) -> BrokerFuture<'a, Result<Vec<OpenPosition>, BrokerError>>;

    /// Flattens every open position.
    ///
    /// The default runs the closing sweep in [`crate::sweep`] over
    /// [`open_positions`](Broker::open_positions). Adapters whose broker
    /// offers native liquidation may override it.
    fn close_all_positions<'a>(&'a self) -> BrokerFuture<'a, PositionCloseResult> {
        Box::pin(async move {
            let snapshot = self.open_positions().await;
            sweep::close_positions(self, snapshot).await
        })
    }

    fn is_market_open<'a>(&'a self) -> BrokerFuture<'a, Result<bool, BrokerError>>;

    /// `Ok(None)` when the adapter has no calendar source or the broker did
    /// not report a next open.
    fn next_market_open_time<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Option<UtcDateTime>, BrokerError>>;
}

impl<B: Broker + ?Sized> Broker for Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn place_market_order<'a>(
        &'a self,
        order: MarketOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        (**self).place_market_order(order)
    }

    fn place_limit_order<'a>(
        &'a self,
        order: LimitOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        (**self).place_limit_order(order)
    }

    fn place_stop_order<'a>(
        &'a self,
        order: StopOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        (**self).place_stop_order(order)
    }

    fn place_short_order<'a>(
        &'a self,
        order: ShortOrder,
    ) -> BrokerFuture<'a, Result<OrderResult, BrokerError>> {
        (**self).place_short_order(order)
    }

    fn open_positions<'a>(&'a self) -> BrokerFuture<'a, Result<Vec<OpenPosition>, BrokerError>> {
        (**self).open_positions()
    }

    fn close_all_positions<'a>(&'a self) -> BrokerFuture<'a, PositionCloseResult> {
        (**self).close_all_positions()
    }

    fn is_market_open<'a>(&'a self) -> BrokerFuture<'a, Result<bool, BrokerError>> {
        (**self).is_market_open()
    }

    fn next_market_open_time<'a>(
        &'a self,
    ) -> BrokerFuture<'a, Result<Option<UtcDateTime>, BrokerError>> {
        (**self).next_market_open_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(BrokerError::unavailable("down").code(), "broker.unavailable");
        assert_eq!(
            BrokerError::internal("poisoned").to_string(),
            "poisoned (broker.internal)"
        );
        assert!(BrokerError::rate_limited("budget").retryable());
        assert!(!BrokerError::malformed_response("bad json").retryable());
    }
}
