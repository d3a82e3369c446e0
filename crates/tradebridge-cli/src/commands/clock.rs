use std::sync::Arc;

use serde::Serialize;
use tradebridge_core::{Broker, OrderDispatcher, UtcDateTime};

use crate::error::CliError;

use super::CommandOutcome;

#[derive(Debug, Serialize)]
struct ClockResponseData<'a> {
    broker: &'a str,
    is_open: bool,
    next_open: Option<UtcDateTime>,
}

pub async fn run(dispatcher: &OrderDispatcher<Arc<dyn Broker>>) -> Result<CommandOutcome, CliError> {
    let is_open = dispatcher.is_market_open().await?;
    let next_open = dispatcher.next_market_open_time().await?;

    let data = serde_json::to_value(ClockResponseData {
        broker: dispatcher.broker().name(),
        is_open,
        next_open,
    })?;
    Ok(CommandOutcome::ok(data))
}
