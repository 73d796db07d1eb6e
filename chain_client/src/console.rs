//! Line commands read from stdin.
//!
//! Stands in for the input widgets and the connect button: `symbol`, `strike`,
//! `expiry` and `spot` edit the input state, `reconnect` sends it.
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::thread;

/// One user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect, or replace the current connection, with the current inputs.
    Reconnect,
    /// Tear the feed down.
    Disconnect,
    /// Set the symbol input.
    Symbol(String),
    /// Set the strike input.
    Strike(String),
    /// Set the expiry input.
    Expiry(String),
    /// Set the comma separated spot range input.
    Spot(String),
    /// Print the current state again.
    Status,
    /// Stop the client.
    Quit,
}

impl Command {
    /// Parse a single input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let argument = |name: &str| {
            if rest.is_empty() {
                Err(format!("`{}` needs a value", name))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "r" | "reconnect" | "connect" => Command::Reconnect,
            "d" | "disconnect" => Command::Disconnect,
            "symbol" => Command::Symbol(argument("symbol")?),
            "strike" => Command::Strike(argument("strike")?),
            "expiry" => Command::Expiry(argument("expiry")?),
            // An empty spot range is a legal input.
            "spot" => Command::Spot(rest.to_string()),
            "s" | "status" => Command::Status,
            "q" | "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command `{}`", other)),
        };
        Ok(Some(command))
    }
}

/// Spawn a thread that reads stdin line by line and forwards parsed commands to `tx`.
/// The thread ends at end of input or once the receiver is dropped.
pub fn spawn_reader(tx: Sender<Command>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            match Command::parse(&line) {
                Ok(Some(command)) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => info!(
                    "{}. Commands: reconnect, disconnect, symbol <s>, strike <n>, expiry <YYYY-MM-DD>, spot <list>, status, quit",
                    message
                ),
            }
        }
        debug!("stdin reader stopping...");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verbs_and_aliases() {
        assert_eq!(Command::parse("r"), Ok(Some(Command::Reconnect)));
        assert_eq!(Command::parse("  Disconnect "), Ok(Some(Command::Disconnect)));
        assert_eq!(Command::parse("q"), Ok(Some(Command::Quit)));
        assert_eq!(Command::parse(""), Ok(None));
    }

    #[test]
    fn setters_keep_their_argument_verbatim() {
        assert_eq!(
            Command::parse("spot 25700, 25750,25800"),
            Ok(Some(Command::Spot(String::from("25700, 25750,25800"))))
        );
        assert_eq!(Command::parse("spot"), Ok(Some(Command::Spot(String::new()))));
        assert_eq!(
            Command::parse("expiry 2026-01-27"),
            Ok(Some(Command::Expiry(String::from("2026-01-27"))))
        );
    }

    #[test]
    fn rejects_unknown_and_missing_values() {
        assert!(Command::parse("launch").is_err());
        assert!(Command::parse("strike").is_err());
    }
}
