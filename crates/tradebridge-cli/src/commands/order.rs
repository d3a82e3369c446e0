use std::sync::Arc;

use serde::Serialize;
use tradebridge_core::{
    Broker, Instrument, LimitOrder, MarketOrder, OrderDispatcher, OrderIntent, OrderResult,
    ShortOrder, StopOrder,
};

use crate::cli::{InstrumentArgs, OrderArgs, OrderCommand};
use crate::error::CliError;

use super::CommandOutcome;

#[derive(Debug, Serialize)]
struct OrderResponseData<'a> {
    broker: &'a str,
    intent: &'a OrderIntent,
    result: OrderResult,
}

pub async fn run(
    args: &OrderArgs,
    dispatcher: &OrderDispatcher<Arc<dyn Broker>>,
) -> Result<CommandOutcome, CliError> {
    let intent = intent_from_args(&args.kind);
    let result = dispatcher.submit(intent.clone()).await?;
    let rejected = !result.is_accepted();

    let data = serde_json::to_value(OrderResponseData {
        broker: dispatcher.broker().name(),
        intent: &intent,
        result,
    })?;
    Ok(CommandOutcome::ok(data).failed_if(rejected))
}

fn intent_from_args(kind: &OrderCommand) -> OrderIntent {
    match kind {
        OrderCommand::Market(args) => MarketOrder::new(
            instrument(&args.instrument),
            args.side,
            args.qty,
        )
        .with_time_in_force(args.tif)
        .into(),
        OrderCommand::Limit(args) => LimitOrder::new(
            instrument(&args.order.instrument),
            args.order.side,
            args.order.qty,
            args.price,
        )
        .with_time_in_force(args.order.tif)
        .into(),
        OrderCommand::Stop(args) => StopOrder::new(
            instrument(&args.order.instrument),
            args.order.side,
            args.order.qty,
            args.price,
        )
        .with_time_in_force(args.order.tif)
        .into(),
        OrderCommand::Short(args) => ShortOrder::new(instrument(&args.instrument), args.qty)
            .with_time_in_force(args.tif)
            .into(),
    }
}

fn instrument(args: &InstrumentArgs) -> Instrument {
    let mut instrument = Instrument::new(args.symbol.clone(), args.sec_type);
    instrument.exchange = args.exchange.clone();
    instrument.currency = args.currency.clone();
    instrument.contract_month = args.contract_month.clone();
    instrument
}
