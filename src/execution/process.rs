//! Child process spawning
//!
//! The argument vector and the working directory are fixed before the spawn.
//! Between fork and exec the child only:
//! 1. Resets its scheduling policy and the SIGINT disposition
//! 2. Drops setuid/setgid privileges (reported on failure, not fatal)
//! 3. Changes to the working directory (reported on failure, not fatal)
//!
//! Exec failures come back to the parent as the spawn error, carrying the OS
//! error number.

use std::ffi::{CStr, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use log::{debug, info, warn};

use crate::errors::{Result, SupervisorError};
use crate::execution::privilege;
use crate::message::Atom;
use crate::pipes::ChildEnds;
use crate::utils;

/// Reported for abnormal termination or when the status cannot be determined
pub const EXIT_STATUS_UNKNOWN: i32 = -1;

/// Process execution configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Program to execute, looked up in PATH when it has no slash
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Directory the child changes into before exec
    pub cwd: PathBuf,
}

impl ProcessConfig {
    /// Build the argument vector from `exec` fields; numbers use their text form
    pub fn from_atoms(atoms: &[Atom], cwd: &Path) -> Result<Self> {
        let mut argv = atoms.iter().map(Atom::to_text);
        let program = argv.next().ok_or(SupervisorError::MissingProgram)?;
        Ok(Self {
            program,
            args: argv.collect(),
            cwd: cwd.to_path_buf(),
        })
    }

    /// Program and arguments joined for log output
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Process executor
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Spawn the child with its standard streams on `ends`.
    ///
    /// The child ends are closed in the parent once this returns.
    pub fn spawn(config: &ProcessConfig, ends: ChildEnds) -> io::Result<Child> {
        let cwd = match CString::new(config.cwd.as_os_str().as_bytes()) {
            Ok(dir) => Some(dir),
            Err(_) => {
                warn!(
                    "working directory {:?} contains a nul byte, child keeps the current one",
                    config.cwd
                );
                None
            }
        };

        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::from(ends.stdin))
            .stdout(Stdio::from(ends.stdout))
            .stderr(Stdio::from(ends.stderr));

        // SAFETY: the hook only makes async-signal-safe libc calls on data
        // captured before the fork.
        unsafe {
            command.pre_exec(move || {
                child_setup(cwd.as_deref());
                Ok(())
            });
        }

        if utils::is_elevated() {
            info!(
                "running with elevated ids, child drops to uid {} gid {}",
                utils::get_uid(),
                utils::get_gid()
            );
        }
        debug!("spawning '{}'", config.command_line());
        command.spawn()
    }
}

fn child_setup(cwd: Option<&CStr>) {
    privilege::drop_priority();
    privilege::reset_interrupt();

    if let Err(message) = privilege::drop_privileges() {
        privilege::report(message);
    }

    if let Some(dir) = cwd {
        // SAFETY: `dir` is a valid nul-terminated string owned by the hook.
        if unsafe { libc::chdir(dir.as_ptr()) } == -1 {
            privilege::report("changing directory failed\n");
        }
    }
}

/// Numeric exit status reported on the done outlet: the exit code of a
/// normal exit, [`EXIT_STATUS_UNKNOWN`] otherwise.
pub fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            if let Some(signal) = status.signal() {
                debug!("child terminated by signal {}", signal);
            }
            EXIT_STATUS_UNKNOWN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_config_from_atoms() {
        let atoms = vec![Atom::symbol("echo"), Atom::Float(1.5), Atom::symbol("x")];
        let config = ProcessConfig::from_atoms(&atoms, Path::new("/tmp")).unwrap();

        assert_eq!(config.program, "echo");
        assert_eq!(config.args, vec!["1.5", "x"]);
        assert_eq!(config.cwd, PathBuf::from("/tmp"));
        assert_eq!(config.command_line(), "echo 1.5 x");
    }

    #[test]
    fn test_process_config_requires_program() {
        let err = ProcessConfig::from_atoms(&[], Path::new("/")).unwrap_err();
        assert!(matches!(err, SupervisorError::MissingProgram));
    }

    #[test]
    fn test_exit_code_normal_exit() {
        assert_eq!(exit_code(ExitStatus::from_raw(7 << 8)), 7);
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
    }

    #[test]
    fn test_exit_code_signaled_is_unknown() {
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGKILL)), EXIT_STATUS_UNKNOWN);
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGINT)), EXIT_STATUS_UNKNOWN);
        assert_eq!(exit_code(ExitStatus::from_raw(libc::SIGTERM)), EXIT_STATUS_UNKNOWN);
    }
}
