use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Instrument;

/// Opaque order identifier assigned by a broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerOrderId(String);

impl BrokerOrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BrokerOrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for BrokerOrderId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Broker verdict for one submission attempt.
///
/// Built once by the adapter and handed back unchanged; there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    accepted: bool,
    broker_order_id: Option<BrokerOrderId>,
    message: String,
}

impl OrderResult {
    pub fn accepted(broker_order_id: Option<BrokerOrderId>, message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            broker_order_id,
            message: message.into(),
        }
    }

    /// Business rejection: the broker was reached and declined the order.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            broker_order_id: None,
            message: message.into(),
        }
    }

    pub const fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn broker_order_id(&self) -> Option<&BrokerOrderId> {
        self.broker_order_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One row of a point-in-time position snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub instrument: Instrument,
    /// Positive is long, negative is short.
    pub signed_quantity: f64,
    pub average_cost: f64,
}

impl OpenPosition {
    pub fn new(instrument: Instrument, signed_quantity: f64, average_cost: f64) -> Self {
        Self {
            instrument,
            signed_quantity,
            average_cost,
        }
    }
}

/// Outcome of one close-all sweep.
///
/// `success` means the sweep ran to completion over a snapshot it could
/// trust. Whether any close was accepted is answered by
/// [`PositionCloseResult::any_accepted`] and
/// [`PositionCloseResult::all_accepted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCloseResult {
    pub success: bool,
    /// Closing orders submitted, accepted or not.
    pub attempted: usize,
    /// Closing orders the broker accepted.
    pub orders_sent: usize,
    /// Identifiers of accepted closes, in snapshot order.
    pub order_ids: Vec<BrokerOrderId>,
    pub message: String,
}

impl PositionCloseResult {
    /// The snapshot could not be obtained; nothing was submitted.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            attempted: 0,
            orders_sent: 0,
            order_ids: Vec::new(),
            message: message.into(),
        }
    }

    pub fn any_accepted(&self) -> bool {
        self.orders_sent > 0
    }

    pub fn all_accepted(&self) -> bool {
        self.success && self.orders_sent == self.attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_result_carries_no_identifier() {
        let result = OrderResult::rejected("insufficient buying power");
        assert!(!result.is_accepted());
        assert!(result.broker_order_id().is_none());
        assert_eq!(result.message(), "insufficient buying power");
    }

    #[test]
    fn completed_sweep_with_no_accepts_is_distinguishable() {
        let result = PositionCloseResult {
            success: true,
            attempted: 2,
            orders_sent: 0,
            order_ids: Vec::new(),
            message: String::from("sent 0 of 2"),
        };
        assert!(!result.any_accepted());
        assert!(!result.all_accepted());
        assert!(PositionCloseResult::aborted("down").order_ids.is_empty());
    }
}
