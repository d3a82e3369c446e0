mod clock;
mod close_all;
mod order;
mod run;

use std::sync::Arc;

use serde_json::Value;
use tradebridge_core::{
    AlpacaBroker, AlpacaConfig, Broker, InMemorySessionGateway, OrderDispatcher, SessionBroker,
};

use crate::cli::{BrokerSelector, Cli, Command};
use crate::error::CliError;

/// JSON payload plus whether the broker declined the request.
pub struct CommandOutcome {
    pub data: Value,
    pub failed: bool,
}

impl CommandOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            failed: false,
        }
    }

    pub fn failed_if(mut self, failed: bool) -> Self {
        self.failed = failed;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    match &cli.command {
        Command::Run(args) => run::run(args, cli).await,
        Command::Order(args) => order::run(args, &dispatcher(cli)?).await,
        Command::CloseAll => close_all::run(&dispatcher(cli)?).await,
        Command::Clock => clock::run(&dispatcher(cli)?).await,
    }
}

fn dispatcher(cli: &Cli) -> Result<OrderDispatcher<Arc<dyn Broker>>, CliError> {
    let broker: Arc<dyn Broker> = match cli.broker {
        BrokerSelector::Alpaca => Arc::new(alpaca(cli)?),
        BrokerSelector::CnPaper => Arc::new(SessionBroker::new(InMemorySessionGateway::new())),
    };
    Ok(OrderDispatcher::new(broker))
}

fn alpaca(cli: &Cli) -> Result<AlpacaBroker, CliError> {
    let config = AlpacaConfig::from_env()?.with_timeout_ms(cli.timeout_ms);
    Ok(AlpacaBroker::new(config))
}
