//! Option Chain Client — subscribes to the live VIX-driven option pricing feed over a
//! WebSocket and prints the latest priced chain to stdout. It sends one subscription
//! request (symbol, strike, expiry, spot range) when the connection opens, keeps only
//! the most recent snapshot, and lets the user edit the inputs and reconnect from stdin.
//!
//! Usage example (CLI):
//! ```bash
//! chain_client --symbol NIFTY --strike 25400 --expiry 2026-01-27 --spot-range 25700,25750,25800
//! ```
//!
//! While running, type commands on stdin: `reconnect`, `disconnect`,
//! `spot <list>`, `strike <n>`, `expiry <date>`, `symbol <s>`, `status`, `quit`.
#![warn(missing_docs)]
mod args;
mod console;

use crate::args::Args;
use crate::console::Command;
use chain_client::render;
use chain_client::transport::{Connector, WsConnector};
use chain_client::{ConnectParams, Session};
use chain_common::ChainError;
use chain_common::Result;
use clap::Parser;
use crossbeam_channel::{never, select, unbounded};
use log::{debug, info, warn};

fn main() -> Result<(), ChainError> {
    init_logger();
    let args = Args::parse();
    let mut params = ConnectParams::from(&args);

    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down client...");
        let _ = shutdown_tx.send(());
    }) {
        warn!("Error setting Ctrl+C handler: {}", e);
    }

    let (command_tx, command_rx) = unbounded::<Command>();
    console::spawn_reader(command_tx);
    let mut commands = command_rx;

    let mut session = Session::new(WsConnector);
    let updates = session.subscribe();
    let events = session.events();

    print!("{}", render::render(&session.current()));
    if !args.no_connect {
        session.connect(&params)?;
    }

    info!("Client is running. Type `quit` or press Ctrl+C to exit.");
    loop {
        let mut stdin_closed = false;
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => session.handle_event(event),
                Err(e) => return Err(ChainError::ChannelRecv(e.to_string())),
            },
            recv(updates) -> msg => if let Ok(update) = msg {
                print!("{}", render::render(&update));
            },
            recv(commands) -> msg => match msg {
                Ok(Command::Quit) => break,
                Ok(command) => apply(&mut session, &mut params, command),
                Err(_) => stdin_closed = true,
            },
            recv(shutdown_rx) -> _ => break,
        }
        if stdin_closed {
            debug!("stdin closed, running until Ctrl+C");
            commands = never();
        }
    }

    session.disconnect();
    info!("Client stopped.");
    Ok(())
}

/// Apply one stdin command to the input state or the session.
fn apply<C: Connector>(session: &mut Session<C>, params: &mut ConnectParams, command: Command) {
    match command {
        Command::Reconnect => {
            if let Err(e) = session.connect(params) {
                warn!("Not connecting: {}", e);
            }
        }
        Command::Disconnect => session.disconnect(),
        Command::Symbol(symbol) => params.symbol = symbol,
        Command::Strike(strike) => params.strike = strike,
        Command::Expiry(expiry) => params.expiry = expiry,
        Command::Spot(spot_range) => params.spot_range = spot_range,
        Command::Status => {
            print!("{}", render::render(&session.current()));
            info!("Inputs: {:?}", params);
            return;
        }
        Command::Quit => return,
    }
    debug!("Inputs now: {:?}", params);
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
