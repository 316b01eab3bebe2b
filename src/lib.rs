//! proc-command: subprocess supervisor for message-driven hosts
//!
//! Starts an external program, streams its stdout and stderr back as discrete
//! messages, feeds it lines on stdin, interrupts it on request and reports its
//! exit status. Everything runs on the host's thread: readiness and timer
//! callbacks drive the supervisor, which never blocks unless configured to.
//!
//! # Modules
//!
//! - **supervisor**: Lifecycle state machine, output reader, exit poller
//! - **execution**: Spawning and privilege reset in the child
//! - **pipes**: Pipe set between supervisor and child
//! - **framing**: Text and binary conversion of output bytes to messages
//! - **command**: Inbound `exec` / `kill` / `send` / `env` commands
//! - **host**: Interface the embedding event loop implements
//! - **event_loop**: Poll-based host for standalone use
//!
//! # Example
//!
//! ```ignore
//! use proc_command::{Command, PollLoop, Supervisor, SupervisorConfig};
//! use std::time::Duration;
//!
//! let mut supervisor = Supervisor::new(SupervisorConfig::default());
//! let mut host = PollLoop::new();
//!
//! let exec = Command::parse_line("exec echo hello 1 2")?;
//! supervisor.dispatch(&mut host, &exec);
//! let status = host.run_until_exit(&mut supervisor, Duration::from_secs(5))?;
//! for event in host.take_events() {
//!     println!("{}: {}", event.outlet, event.message);
//! }
//! ```

// Core modules
pub mod errors;
pub mod message;
pub mod utils;

// Layered modules
pub mod config;
pub mod execution;
pub mod framing;
pub mod host;
pub mod pipes;

pub mod command;
pub mod event_loop;
pub mod supervisor;

// Public API
pub use command::Command;
pub use config::{BackoffConfig, SupervisorConfig};
pub use errors::{Result, SupervisorError};
pub use event_loop::{Emission, PollLoop};
pub use framing::OutputMode;
pub use host::{Host, Outlet, OutputStream};
pub use message::{Atom, Message};
pub use supervisor::{Phase, Supervisor};
