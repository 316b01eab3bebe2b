//! Execution layer: spawning the child and interpreting its exit
//!
//! # Examples
//!
//! ```ignore
//! use proc_command::execution::{ProcessConfig, ProcessExecutor};
//! use proc_command::pipes::PipeSet;
//!
//! let config = ProcessConfig {
//!     program: "/bin/echo".to_string(),
//!     args: vec!["hello".to_string()],
//!     cwd: "/tmp".into(),
//! };
//! let (pipes, ends) = PipeSet::create()?;
//! let child = ProcessExecutor::spawn(&config, ends)?;
//! ```

pub mod privilege;
pub mod process;
pub use process::{EXIT_STATUS_UNKNOWN, ProcessConfig, ProcessExecutor, exit_code};
