//! Supervisor configuration
//!
//! Set once when the instance is created: output mode, blocking mode, working
//! directory for children, and the exit poller's back-off schedule.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::framing::OutputMode;
use crate::message::{Atom, render_fields};

/// Exit poller schedule: first delay, increment per miss, ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub step: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(4),
            step: Duration::from_millis(2),
            max: Duration::from_millis(100),
        }
    }
}

/// Per-instance configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    /// Text or binary framing of stdout/stderr
    pub mode: OutputMode,
    /// Block in `exec` until the child exits instead of polling
    pub synchronous: bool,
    /// Directory children are started in
    pub working_dir: PathBuf,
    pub backoff: BackoffConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Text,
            synchronous: false,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            backoff: BackoffConfig::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit raw byte values instead of parsed text messages
    pub fn binary(mut self, enabled: bool) -> Self {
        self.mode = if enabled {
            OutputMode::Binary
        } else {
            OutputMode::Text
        };
        self
    }

    /// Block until the child exits
    pub fn synchronous(mut self, enabled: bool) -> Self {
        self.synchronous = enabled;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Parse creation arguments: leading `-b` / `-s` flags in any order.
    ///
    /// Unknown flags are reported and skipped; whatever follows the flags is
    /// ignored with a warning.
    pub fn from_creation_args(args: &[Atom]) -> Self {
        let mut config = Self::default();
        let mut rest = args;

        while let Some((first, tail)) = rest.split_first() {
            let Some(flag) = first.as_symbol().filter(|s| s.starts_with('-')) else {
                break;
            };
            match flag {
                "-b" => config.mode = OutputMode::Binary,
                "-s" => config.synchronous = true,
                other => warn!("unknown flag {}", other),
            }
            rest = tail;
        }

        if !rest.is_empty() {
            warn!("extra arguments ignored: {}", render_fields(rest));
        }
        config
    }
}
