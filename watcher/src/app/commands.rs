//! Interactive commands read from stdin

use std::str::FromStr;

use crate::errors::WatchError;
use crate::page::fsm::AuthMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Retry after an error
    Retry,
    /// Message from the external auth flow
    Auth(AuthMessage),
    /// Expand (or collapse, when already expanded) a deployment
    Toggle(String),
    Collapse,
    Redeploy,
    Quit,
}

impl FromStr for Command {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.starts_with('{') {
            let message: AuthMessage = serde_json::from_str(line)?;
            return Ok(Command::Auth(message));
        }

        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match (verb.to_lowercase().as_str(), arg) {
            ("retry", "") => Ok(Command::Retry),
            ("connected", "") => Ok(Command::Auth(AuthMessage::Connected)),
            ("expand", id) if !id.is_empty() => Ok(Command::Toggle(id.to_string())),
            ("collapse", "") => Ok(Command::Collapse),
            ("redeploy", "") => Ok(Command::Redeploy),
            ("quit" | "exit", "") => Ok(Command::Quit),
            _ => Err(WatchError::ConfigError(format!("Unknown command: {}", line))),
        }
    }
}
