//! Position-closing sweep.
//!
//! Turns a position snapshot into offsetting market orders and submits them
//! one by one through [`crate::dispatch::submit`]. A rejected or failed close
//! never stops the sweep; the remaining positions are still processed.
//!
//! The snapshot may already be stale when the sweep starts. Positions that
//! changed in between are closed at their snapshot quantity.

use tracing::{debug, info, warn};

use crate::dispatch;
use crate::{
    Broker, BrokerError, BrokerOrderId, MarketOrder, OpenPosition, OrderIntent,
    PositionCloseResult, Side, TimeInForce,
};

/// Quantities at or below this magnitude are treated as flat.
pub const FLAT_EPSILON: f64 = 1e-12;

/// Closing order for one position, or `None` when the position is flat or
/// its quantity is not a finite number.
///
/// Shorts close with a buy, longs with a sell, always Day and for the
/// absolute quantity. Instrument fields are copied unchanged.
pub fn closing_order(position: &OpenPosition) -> Option<MarketOrder> {
    let quantity = position.signed_quantity;
    if !quantity.is_finite() || quantity.abs() <= FLAT_EPSILON {
        return None;
    }

    let side = if quantity < 0.0 { Side::Buy } else { Side::Sell };
    Some(
        MarketOrder::new(position.instrument.clone(), side, quantity.abs())
            .with_time_in_force(TimeInForce::Day),
    )
}

#[derive(Debug, Default)]
struct SweepTally {
    attempted: usize,
    accepted: usize,
    unreadable: usize,
    order_ids: Vec<BrokerOrderId>,
}

impl SweepTally {
    fn into_result(self) -> PositionCloseResult {
        let mut message = format!(
            "close all positions: sent {} of {} market close orders",
            self.accepted, self.attempted
        );
        if self.unreadable > 0 {
            message.push_str(&format!(
                "; {} positions had an unreadable quantity",
                self.unreadable
            ));
        }
        PositionCloseResult {
            success: true,
            attempted: self.attempted,
            orders_sent: self.accepted,
            order_ids: self.order_ids,
            message,
        }
    }
}

/// Runs one sweep over `snapshot`.
///
/// A failed snapshot aborts before any order is sent. Otherwise the result
/// reports `success = true` once every position has been visited, with
/// `orders_sent` counting accepted closes only. A position whose quantity
/// is not finite counts as attempted and never accepted.
pub async fn close_positions<B>(
    broker: &B,
    snapshot: Result<Vec<OpenPosition>, BrokerError>,
) -> PositionCloseResult
where
    B: Broker + ?Sized,
{
    let positions = match snapshot {
        Ok(positions) => positions,
        Err(error) => {
            warn!(broker = broker.name(), %error, "position snapshot failed; sweep aborted");
            return PositionCloseResult::aborted(format!("failed to fetch positions: {error}"));
        }
    };

    let mut tally = SweepTally::default();
    for position in &positions {
        if !position.signed_quantity.is_finite() {
            warn!(
                broker = broker.name(),
                symbol = %position.instrument.symbol,
                quantity = position.signed_quantity,
                "position quantity unreadable; not closed"
            );
            tally.attempted += 1;
            tally.unreadable += 1;
            continue;
        }
        let Some(order) = closing_order(position) else {
            continue;
        };

        tally.attempted += 1;
        let symbol = order.instrument.symbol.clone();
        let side = order.side;

        match dispatch::submit(broker, OrderIntent::Market(order)).await {
            Ok(result) if result.is_accepted() => {
                debug!(broker = broker.name(), %symbol, %side, "close accepted");
                tally.accepted += 1;
                if let Some(id) = result.broker_order_id() {
                    tally.order_ids.push(id.clone());
                }
            }
            Ok(result) => {
                warn!(
                    broker = broker.name(),
                    %symbol,
                    reason = result.message(),
                    "close rejected; continuing"
                );
            }
            Err(error) => {
                warn!(broker = broker.name(), %symbol, %error, "close failed; continuing");
            }
        }
    }

    let result = tally.into_result();
    info!(
        broker = broker.name(),
        attempted = result.attempted,
        accepted = result.orders_sent,
        "close-all sweep finished"
    );
    result
}
