//! Poll-based host for running a supervisor outside an embedding application
//!
//! [`PollLoop`] keeps the watched descriptors and the single timer deadline,
//! waits with `poll(2)` and dispatches readiness and timer callbacks. Messages
//! posted to outlets are queued as [`Emission`]s for the caller to collect.

use std::fmt;
use std::io;
use std::os::unix::io::{BorrowedFd, RawFd};
use std::time::{Duration, Instant};

use log::{debug, trace};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::host::{Host, Outlet, OutputStream};
use crate::message::Message;
use crate::supervisor::Supervisor;

/// A message posted to an outlet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    pub outlet: Outlet,
    pub message: Message,
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.outlet, self.message)
    }
}

/// Single-threaded event loop implementing [`Host`]
#[derive(Debug, Default)]
pub struct PollLoop {
    watched: Vec<(RawFd, OutputStream)>,
    deadline: Option<Instant>,
    events: Vec<Emission>,
    exit_status: Option<i32>,
}

impl PollLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `max_wait` (less if the timer is due sooner) and dispatch
    /// whatever became ready.
    pub fn turn(&mut self, supervisor: &mut Supervisor, max_wait: Duration) -> Result<()> {
        let mut wait = max_wait;
        if let Some(deadline) = self.deadline {
            wait = wait.min(deadline.saturating_duration_since(Instant::now()));
        }

        for stream in self.wait_readable(wait)? {
            supervisor.on_readable(self, stream);
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.deadline = None;
                supervisor.on_timer(self);
            }
        }
        Ok(())
    }

    /// Turn until the supervisor reports an exit status or `timeout` passes.
    ///
    /// Returns `None` on timeout or when the supervisor is idle without a
    /// pending status.
    pub fn run_until_exit(
        &mut self,
        supervisor: &mut Supervisor,
        timeout: Duration,
    ) -> Result<Option<i32>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.exit_status.take() {
                return Ok(Some(code));
            }
            if !supervisor.is_running() {
                return Ok(None);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.turn(supervisor, deadline - now)?;
        }
    }

    /// Drain queued emissions
    pub fn take_events(&mut self) -> Vec<Emission> {
        std::mem::take(&mut self.events)
    }

    /// Nothing watched and no timer armed
    pub fn is_idle(&self) -> bool {
        self.watched.is_empty() && self.deadline.is_none()
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    pub fn timer_armed(&self) -> bool {
        self.deadline.is_some()
    }

    fn wait_readable(&self, wait: Duration) -> Result<Vec<OutputStream>> {
        // SAFETY: watched descriptors stay open until the supervisor
        // unregisters them, which cannot happen during this call.
        let mut fds: Vec<PollFd> = self
            .watched
            .iter()
            .map(|(fd, _)| PollFd::new(unsafe { BorrowedFd::borrow_raw(*fd) }, PollFlags::POLLIN))
            .collect();

        let millis = wait.as_micros().div_ceil(1000).min(u128::from(u16::MAX)) as u16;
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => return Ok(Vec::new()),
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok(Vec::new()),
            Err(e) => return Err(io::Error::from(e).into()),
        }

        let ready_flags = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
        Ok(fds
            .iter()
            .zip(&self.watched)
            .filter(|(pfd, _)| pfd.revents().is_some_and(|r| r.intersects(ready_flags)))
            .map(|(_, (_, stream))| *stream)
            .collect())
    }
}

impl Host for PollLoop {
    fn watch(&mut self, fd: RawFd, stream: OutputStream) {
        self.watched.retain(|(watched, _)| *watched != fd);
        self.watched.push((fd, stream));
        trace!("watching fd {} as {}", fd, stream);
    }

    fn unwatch(&mut self, fd: RawFd) {
        self.watched.retain(|(watched, _)| *watched != fd);
        trace!("unwatched fd {}", fd);
    }

    fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    fn unschedule(&mut self) {
        self.deadline = None;
    }

    fn emit(&mut self, outlet: Outlet, message: Message) {
        if let (Outlet::Done, Message::Float(code)) = (outlet, &message) {
            self.exit_status = Some(*code as i32);
        }
        debug!("{}: {}", outlet, message);
        self.events.push(Emission { outlet, message });
    }
}
