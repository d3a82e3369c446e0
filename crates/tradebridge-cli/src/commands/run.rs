use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tradebridge_core::{
    LiveLoop, LiveLoopConfig, Market, SecondaryMarket, Shutdown, SystemClock, UtcSessionWindow,
};

use crate::cli::{BrokerSelector, Cli, RunArgs};
use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(args: &RunArgs, cli: &Cli) -> Result<CommandOutcome, CliError> {
    if cli.broker != BrokerSelector::Alpaca {
        return Err(CliError::Command(String::from(
            "the live loop needs the alpaca broker for the US session clock",
        )));
    }
    if args.interval_secs == 0 {
        return Err(CliError::Command(String::from(
            "--interval-secs must be greater than zero",
        )));
    }

    let config = LiveLoopConfig {
        interval: Duration::from_secs(args.interval_secs),
        primary_symbol: args.us_symbol.clone(),
        secondary_symbol: args.cn_symbol.clone(),
        timeframe: args.timeframe,
    };
    let live_loop = LiveLoop::new(super::alpaca(cli)?, Arc::new(SystemClock), config)
        .with_secondary(SecondaryMarket::new(
            Market::Cn,
            UtcSessionWindow::china_a_shares(),
        ));

    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping live loop");
            trigger.fire();
        }
    });

    let summary = live_loop
        .run(shutdown, args.max_cycles, |report| println!("{report}"))
        .await;

    Ok(CommandOutcome::ok(serde_json::json!({
        "cycles": summary.cycles,
        "cancelled": summary.cancelled,
    })))
}
