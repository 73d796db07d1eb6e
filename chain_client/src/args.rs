//! Command-line arguments for the option chain client.
//!
//! The values seed the input state; they can be edited later from stdin (see `console`).
use clap::Parser;

use chain_client::ConnectParams;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Instrument identifier to price.
    #[clap(long, default_value = "NIFTY")]
    pub symbol: String,

    /// Strike price.
    #[clap(long, default_value = "25400")]
    pub strike: String,

    /// Expiry date as YYYY-MM-DD.
    #[clap(long, default_value = "2026-01-27")]
    pub expiry: String,

    /// Spot prices to evaluate, comma separated.
    #[clap(long, default_value = "25700,25750,25800,25850,25900")]
    pub spot_range: String,

    /// Start without connecting; use `reconnect` on stdin to connect.
    #[clap(long)]
    pub no_connect: bool,
}

impl From<&Args> for ConnectParams {
    fn from(args: &Args) -> Self {
        ConnectParams {
            symbol: args.symbol.trim().to_string(),
            strike: args.strike.trim().to_string(),
            expiry: args.expiry.trim().to_string(),
            spot_range: args.spot_range.trim().to_string(),
        }
    }
}
