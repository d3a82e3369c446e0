//! CLI argument definitions for tradebridge.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Live loop: pick the open market each cycle and sample its first bar |
//! | `order market\|limit\|stop\|short` | Validate and submit one order |
//! | `close-all` | Flatten every open position |
//! | `clock` | Broker market-open state and next open time |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--broker` | `alpaca` | Adapter used for the command |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | `3000` | Per-request HTTP timeout |
//!
//! Alpaca credentials come from `TRADEBRIDGE_ALPACA_API_KEY` and
//! `TRADEBRIDGE_ALPACA_API_SECRET`. Log verbosity follows `RUST_LOG`.
//!
//! # Examples
//!
//! ```bash
//! tradebridge clock --pretty
//! tradebridge order limit AAPL --side buy --qty 10 --price 180.5 --tif gtc
//! tradebridge --broker cn-paper order market 600519 --side buy --qty 100 --exchange SSE
//! tradebridge run --interval-secs 30 --max-cycles 10
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

use tradebridge_core::{SecurityType, Side, TimeInForce, Timeframe};

#[derive(Debug, Parser)]
#[command(
    name = "tradebridge",
    author,
    version,
    about = "Broker-neutral order placement and market-session live loop"
)]
pub struct Cli {
    /// Broker adapter to use.
    #[arg(long, global = true, value_enum, default_value_t = BrokerSelector::Alpaca)]
    pub broker: BrokerSelector,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Request timeout budget in milliseconds.
    #[arg(long, global = true, default_value_t = 3000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrokerSelector {
    /// Alpaca paper trading over REST.
    Alpaca,
    /// CN session broker backed by the in-memory paper gateway.
    CnPaper,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the market-session live loop until Ctrl-C.
    Run(RunArgs),
    /// Submit one order.
    Order(OrderArgs),
    /// Close every open position.
    CloseAll,
    /// Show whether the market is open and when it next opens.
    Clock,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Pause between cycles, in seconds.
    #[arg(long, default_value_t = 30)]
    pub interval_secs: u64,

    /// Proxy instrument for the US session.
    #[arg(long, default_value = "SPY")]
    pub us_symbol: String,

    /// Proxy instrument for the CN session.
    #[arg(long, default_value = "SSE")]
    pub cn_symbol: String,

    /// Bar width of the first-interval sample.
    #[arg(long, default_value = "5m")]
    pub timeframe: Timeframe,

    /// Stop after this many cycles.
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Args)]
pub struct OrderArgs {
    #[command(subcommand)]
    pub kind: OrderCommand,
}

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    Market(SidedOrderArgs),
    Limit(PricedOrderArgs),
    Stop(PricedOrderArgs),
    /// Sell without an ownership check.
    Short(ShortOrderArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InstrumentArgs {
    pub symbol: String,

    #[arg(long, default_value = "STK")]
    pub sec_type: SecurityType,

    #[arg(long)]
    pub exchange: Option<String>,

    #[arg(long)]
    pub currency: Option<String>,

    /// Contract month (YYYYMM), required for futures.
    #[arg(long)]
    pub contract_month: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SidedOrderArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,

    #[arg(long)]
    pub side: Side,

    #[arg(long)]
    pub qty: f64,

    #[arg(long, default_value = "day")]
    pub tif: TimeInForce,
}

#[derive(Debug, Clone, Args)]
pub struct PricedOrderArgs {
    #[command(flatten)]
    pub order: SidedOrderArgs,

    /// Limit price for `limit`, trigger price for `stop`.
    #[arg(long)]
    pub price: f64,
}

#[derive(Debug, Clone, Args)]
pub struct ShortOrderArgs {
    #[command(flatten)]
    pub instrument: InstrumentArgs,

    #[arg(long)]
    pub qty: f64,

    #[arg(long, default_value = "day")]
    pub tif: TimeInForce,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_limit_order_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tradebridge",
            "order",
            "limit",
            "AAPL",
            "--side",
            "buy",
            "--qty",
            "10",
            "--price",
            "180.5",
            "--tif",
            "gtc",
            "--pretty",
        ])
        .expect("valid arguments");

        assert!(cli.pretty);
        assert_eq!(cli.broker, BrokerSelector::Alpaca);
        let Command::Order(OrderArgs {
            kind: OrderCommand::Limit(args),
        }) = cli.command
        else {
            panic!("expected a limit order");
        };
        assert_eq!(args.order.instrument.symbol, "AAPL");
        assert_eq!(args.order.side, Side::Buy);
        assert_eq!(args.order.tif, TimeInForce::GoodTillCanceled);
        assert_eq!(args.price, 180.5);
    }

    #[test]
    fn run_defaults_match_the_live_loop() {
        let cli = Cli::try_parse_from(["tradebridge", "--broker", "cn-paper", "run"])
            .expect("valid arguments");
        assert_eq!(cli.broker, BrokerSelector::CnPaper);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.interval_secs, 30);
        assert_eq!(args.us_symbol, "SPY");
        assert_eq!(args.cn_symbol, "SSE");
        assert_eq!(args.timeframe, Timeframe::FiveMinutes);
        assert_eq!(args.max_cycles, None);
    }

    #[test]
    fn rejects_unknown_side() {
        let error = Cli::try_parse_from([
            "tradebridge",
            "order",
            "market",
            "AAPL",
            "--side",
            "hold",
            "--qty",
            "1",
        ])
        .expect_err("side must be buy or sell");
        assert_eq!(error.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
