//! Process supervisor
//!
//! One [`Supervisor`] manages at most one child at a time. It moves between
//! three phases:
//!
//! - **Idle**: no child, no pipes, no timer
//! - **Running**: pipes registered with the host, exit poller armed
//! - **Kill requested**: like running, after SIGINT was delivered
//!
//! Output is pulled by the host calling [`Supervisor::on_readable`]; exit is
//! detected by [`Supervisor::on_timer`]. When the exit is seen the remaining
//! output is drained once, everything is released and the status goes to the
//! done outlet.

mod poller;
mod reader;

pub use poller::Backoff;
pub use reader::READ_BUFFER_SIZE;

use std::io::Write;
use std::process::Child;

use log::{debug, error, info, trace, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::command::{Command, set_environment};
use crate::config::SupervisorConfig;
use crate::errors::{Result, SupervisorError};
use crate::execution::{EXIT_STATUS_UNKNOWN, ProcessConfig, ProcessExecutor, exit_code};
use crate::framing::OutputMode;
use crate::host::{Host, Outlet};
use crate::message::{Atom, Message, render_fields};
use crate::pipes::PipeSet;

/// Observable lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    KillRequested,
}

/// State that only exists while a child is live
#[derive(Debug)]
struct ActiveProcess {
    child: Child,
    pid: Pid,
    pipes: PipeSet,
    mode: OutputMode,
    backoff: Backoff,
    kill_requested: bool,
}

/// Subprocess supervisor bound to a host
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    active: Option<ActiveProcess>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            None => Phase::Idle,
            Some(active) if active.kill_requested => Phase::KillRequested,
            Some(_) => Phase::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Pid of the current child
    pub fn pid(&self) -> Option<Pid> {
        self.active.as_ref().map(|active| active.pid)
    }

    /// Pipes of the current child
    pub fn pipes(&self) -> Option<&PipeSet> {
        self.active.as_ref().map(|active| &active.pipes)
    }

    /// Start a child from `exec` fields: program followed by its arguments.
    ///
    /// Refused while a child is active; the running child is left untouched.
    /// If the program cannot be started, its OS error number is emitted on
    /// the done outlet and the instance returns to idle.
    pub fn exec(&mut self, host: &mut dyn Host, fields: &[Atom]) -> Result<()> {
        if self.active.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let config = ProcessConfig::from_atoms(fields, &self.config.working_dir)?;
        let (mut pipes, ends) = PipeSet::create()?;
        pipes.register(host);

        let child = match ProcessExecutor::spawn(&config, ends) {
            Ok(child) => child,
            Err(source) => {
                pipes.release(host);
                let code = source.raw_os_error().unwrap_or(EXIT_STATUS_UNKNOWN);
                host.emit(Outlet::Done, Message::Float(f64::from(code)));
                return Err(SupervisorError::Spawn {
                    program: config.program,
                    source,
                });
            }
        };

        let pid = Pid::from_raw(child.id() as i32);
        info!("started '{}' as pid {}", config.command_line(), pid);

        let backoff = Backoff::new(self.config.backoff);
        let first_delay = backoff.delay();
        self.active = Some(ActiveProcess {
            child,
            pid,
            pipes,
            mode: self.config.mode,
            backoff,
            kill_requested: false,
        });

        if self.config.synchronous {
            self.wait_blocking(host);
        } else {
            host.schedule(first_delay);
        }
        Ok(())
    }

    /// Send SIGINT to the child. Does nothing when no child is active.
    pub fn kill(&mut self) -> Result<()> {
        let Some(active) = self.active.as_mut().filter(|a| a.pipes.has_stdin()) else {
            debug!("kill ignored, no process running");
            return Ok(());
        };

        signal::kill(active.pid, Signal::SIGINT).map_err(|source| SupervisorError::Signal {
            pid: active.pid.as_raw(),
            source,
        })?;
        active.kill_requested = true;
        info!("sent SIGINT to pid {}", active.pid);
        Ok(())
    }

    /// Write the fields to the child's stdin, separated by single spaces.
    ///
    /// No terminator is appended. Does nothing without a child or without
    /// fields.
    pub fn send(&mut self, fields: &[Atom]) -> Result<()> {
        let Some(stdin) = self.active.as_mut().and_then(|a| a.pipes.stdin_mut()) else {
            debug!("send ignored, no process running");
            return Ok(());
        };
        if fields.is_empty() {
            return Ok(());
        }

        let line = render_fields(fields);
        stdin
            .write_all(line.as_bytes())
            .map_err(SupervisorError::StdinWrite)?;
        trace!("wrote {} bytes to stdin", line.len());
        Ok(())
    }

    /// Run one command, logging failures instead of returning them
    pub fn dispatch(&mut self, host: &mut dyn Host, command: &Command) {
        let result = match command {
            Command::Exec(fields) => self.exec(host, fields),
            Command::Kill => self.kill(),
            Command::Send(fields) => self.send(fields),
            Command::Env { name, value } => set_environment(name, value),
        };
        if let Err(e) = result {
            error!("{}", e);
        }
    }

    /// Deregister and close all pipes and disarm the timer. Idempotent.
    ///
    /// The child itself is not signalled.
    pub fn release(&mut self, host: &mut dyn Host) {
        if let Some(mut active) = self.active.take() {
            active.pipes.release(host);
            debug!("released pipes of pid {}", active.pid);
        }
        host.unschedule();
    }

    /// Tear the instance down: SIGINT to a live child, then release.
    pub fn shutdown(&mut self, host: &mut dyn Host) {
        if let Some(active) = &self.active {
            if let Err(e) = signal::kill(active.pid, Signal::SIGINT) {
                error!("killing pid {} failed: {}", active.pid, e);
            }
        }
        self.release(host);
    }

    /// Final drain, release, and exit status on the done outlet
    fn finish(&mut self, host: &mut dyn Host, code: i32) {
        self.drain_ready(host);
        if let Some(active) = &self.active {
            info!("pid {} exited with status {}", active.pid, code);
        }
        self.release(host);
        host.emit(Outlet::Done, Message::Float(f64::from(code)));
    }

    fn wait_blocking(&mut self, host: &mut dyn Host) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let code = match active.child.wait() {
            Ok(status) => exit_code(status),
            Err(e) => {
                error!("waiting for pid {} failed: {}", active.pid, e);
                EXIT_STATUS_UNKNOWN
            }
        };
        self.finish(host, code);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Without a host only the signal can be delivered; pipes close with
        // the process state.
        if let Some(active) = self.active.take() {
            warn!("dropping supervisor with pid {} still active", active.pid);
            if let Err(e) = signal::kill(active.pid, Signal::SIGINT) {
                error!("killing pid {} failed: {}", active.pid, e);
            }
        }
    }
}
