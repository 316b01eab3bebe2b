//! Command interface
//!
//! Inbound messages understood by a supervisor: `exec`, `kill`, `send` and
//! `env`. They arrive either as a [`Message`] from the host or as a text line.

use std::str::FromStr;

use log::{debug, warn};

use crate::errors::{Result, SupervisorError};
use crate::message::{Atom, Message};

/// A parsed inbound command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a program: program name followed by its arguments
    Exec(Vec<Atom>),
    /// Interrupt the running program
    Kill,
    /// Write one line to the program's stdin
    Send(Vec<Atom>),
    /// Set a variable in the supervisor's environment, inherited by later children
    Env { name: String, value: String },
}

impl Command {
    /// Interpret a tagged message by its selector
    pub fn from_message(message: &Message) -> Result<Self> {
        let Message::Anything { selector, args } = message else {
            return Err(SupervisorError::InvalidCommand(format!(
                "no method for '{}'",
                message
            )));
        };

        match selector.as_str() {
            "exec" => Ok(Command::Exec(args.clone())),
            "kill" => {
                if !args.is_empty() {
                    warn!("kill: extra arguments ignored");
                }
                Ok(Command::Kill)
            }
            "send" => Ok(Command::Send(args.clone())),
            "env" => match args.as_slice() {
                [name, value] => Ok(Command::Env {
                    name: name.to_text(),
                    value: value.to_text(),
                }),
                _ => Err(SupervisorError::InvalidCommand(
                    "env expects a name and a value".to_string(),
                )),
            },
            other => Err(SupervisorError::InvalidCommand(format!(
                "no method for '{}'",
                other
            ))),
        }
    }

    /// Parse a whitespace-separated command line such as `exec ls -l`
    pub fn parse_line(line: &str) -> Result<Self> {
        let atoms: Vec<Atom> = line.split_whitespace().map(Atom::parse).collect();
        let message = Message::from_atoms(atoms)
            .ok_or_else(|| SupervisorError::InvalidCommand("empty command".to_string()))?;
        Self::from_message(&message)
    }
}

impl FromStr for Command {
    type Err = SupervisorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s)
    }
}

/// Set `name=value` in the process environment.
///
/// Names must be non-empty and free of `=`; neither part may contain NUL.
pub fn set_environment(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(SupervisorError::Environment(format!(
            "invalid name {:?}",
            name
        )));
    }
    if value.contains('\0') {
        return Err(SupervisorError::Environment(format!(
            "value of {} contains a nul byte",
            name
        )));
    }

    std::env::set_var(name, value);
    debug!("set {}={}", name, value);
    Ok(())
}
