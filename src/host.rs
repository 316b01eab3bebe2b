//! Interface to the embedding host
//!
//! The supervisor never blocks and owns no event loop. Everything it needs from
//! its environment goes through [`Host`]: readiness registration for the two
//! output pipes, a single re-armable timer for the exit poller, and the three
//! outlets messages are posted to.
//!
//! In return the host calls [`Supervisor::on_readable`] when a watched
//! descriptor becomes readable and [`Supervisor::on_timer`] when the timer
//! fires.
//!
//! [`Supervisor::on_readable`]: crate::Supervisor::on_readable
//! [`Supervisor::on_timer`]: crate::Supervisor::on_timer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::message::Message;

/// Child output stream a watched descriptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const ALL: [OutputStream; 2] = [OutputStream::Stdout, OutputStream::Stderr];

    /// Outlet that receives this stream's messages
    pub fn outlet(self) -> Outlet {
        match self {
            OutputStream::Stdout => Outlet::Stdout,
            OutputStream::Stderr => Outlet::Stderr,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Downstream channels of one supervisor instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlet {
    /// Exit status, one number per completed process
    Done,
    Stdout,
    Stderr,
}

impl fmt::Display for Outlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outlet::Done => "done",
            Outlet::Stdout => "stdout",
            Outlet::Stderr => "stderr",
        })
    }
}

/// Facilities the embedding host provides to a supervisor
pub trait Host {
    /// Start reporting readiness of `fd` as `stream`
    fn watch(&mut self, fd: RawFd, stream: OutputStream);

    /// Stop reporting readiness of `fd`. Unknown descriptors are ignored.
    fn unwatch(&mut self, fd: RawFd);

    /// Arm the instance timer, replacing any pending deadline
    fn schedule(&mut self, delay: Duration);

    /// Disarm the instance timer
    fn unschedule(&mut self);

    /// Post a message to an outlet
    fn emit(&mut self, outlet: Outlet, message: Message);
}
