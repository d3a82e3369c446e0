use std::sync::Arc;

use tradebridge_core::{Broker, OrderDispatcher};

use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(dispatcher: &OrderDispatcher<Arc<dyn Broker>>) -> Result<CommandOutcome, CliError> {
    let result = dispatcher.close_all_positions().await;
    let failed = !result.success;
    let data = serde_json::json!({
        "broker": dispatcher.broker().name(),
        "result": result,
    });
    Ok(CommandOutcome::ok(data).failed_if(failed))
}
