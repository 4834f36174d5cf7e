//! Console ligne à ligne sur l'entrée standard.
//!
//! Elle joue le rôle de l'interface graphique : chaque commande appelle une
//! action du [`ControlBridge`].

use dccserver::logs::{level_to_string, string_to_level};
use dccserver::{ControlBridge, LogHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, info, warn};

pub const HELP: &str = "\
Commands:
  start          start the control server
  stop           stop the control server
  info           print the server state as JSON
  shutdown       shut the host down
  ready          notify that the interface is ready
  log <LEVEL>    change the log level (ERROR, WARN, INFO, DEBUG, TRACE)
  exit [code]    stop the server and exit
  help           print this help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Info,
    Shutdown,
    Ready,
    Log(Level),
    Exit(i32),
    Help,
}

impl ConsoleCommand {
    /// Analyse une ligne. `Ok(None)` pour une ligne vide.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (name.to_lowercase().as_str(), arg) {
            ("start", None) => ConsoleCommand::Start,
            ("stop", None) => ConsoleCommand::Stop,
            ("info", None) => ConsoleCommand::Info,
            ("shutdown", None) => ConsoleCommand::Shutdown,
            ("ready", None) => ConsoleCommand::Ready,
            ("help", None) | ("?", None) => ConsoleCommand::Help,
            ("log", Some(level)) => ConsoleCommand::Log(
                string_to_level(level).ok_or_else(|| format!("unknown log level '{}'", level))?,
            ),
            ("exit", None) | ("quit", None) => ConsoleCommand::Exit(0),
            ("exit", Some(code)) => ConsoleCommand::Exit(
                code.parse()
                    .map_err(|_| format!("invalid exit code '{}'", code))?,
            ),
            _ => return Err(format!("unknown command '{}'", line.trim())),
        };
        Ok(Some(command))
    }
}

/// Exécute une commande et retourne le texte à afficher
pub async fn execute(bridge: &ControlBridge, log: &LogHandle, command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::Start => format!("start: {}", bridge.server_start().await),
        ConsoleCommand::Stop => format!("stop: {}", bridge.server_stop().await),
        ConsoleCommand::Info => {
            let snapshot = bridge.server_info().await;
            let address = snapshot.display_address().to_string();
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => format!("{}\nhttp://{}:{}/", json, address, snapshot.port),
                Err(e) => format!("info: {}", e),
            }
        }
        ConsoleCommand::Shutdown => match bridge.system_shutdown().await {
            Ok(output) => format!("shutdown: {}", output),
            Err(e) => format!("shutdown failed: {}", e),
        },
        ConsoleCommand::Ready => {
            bridge.notify_ready();
            "ready".to_string()
        }
        ConsoleCommand::Log(level) => {
            log.set_max_level(level);
            format!("log level: {}", level_to_string(log.max_level()))
        }
        ConsoleCommand::Exit(code) => {
            bridge.exit(code);
            format!("exiting with code {}", code)
        }
        ConsoleCommand::Help => HELP.to_string(),
    }
}

/// Lit l'entrée standard jusqu'à sa fermeture
pub async fn run(bridge: ControlBridge, log: LogHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("⌨️ Console ready, type 'help' for commands");

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ConsoleCommand::parse(&line) {
                Ok(Some(command)) => println!("{}", execute(&bridge, &log, command).await),
                Ok(None) => {}
                Err(e) => println!("{}\n{}", e, HELP),
            },
            Ok(None) => {
                info!("Console input closed");
                break;
            }
            Err(e) => {
                warn!("❌ Console read error: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("start").unwrap(), Some(ConsoleCommand::Start));
        assert_eq!(ConsoleCommand::parse("  INFO ").unwrap(), Some(ConsoleCommand::Info));
        assert_eq!(
            ConsoleCommand::parse("log debug").unwrap(),
            Some(ConsoleCommand::Log(Level::DEBUG))
        );
        assert_eq!(ConsoleCommand::parse("exit").unwrap(), Some(ConsoleCommand::Exit(0)));
        assert_eq!(ConsoleCommand::parse("exit 2").unwrap(), Some(ConsoleCommand::Exit(2)));
        assert_eq!(ConsoleCommand::parse("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("reboot").is_err());
        assert!(ConsoleCommand::parse("log loud").is_err());
        assert!(ConsoleCommand::parse("exit soon").is_err());
        assert!(ConsoleCommand::parse("start now").is_err());
    }
}
