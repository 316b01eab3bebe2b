//! Pipe set wiring a child's standard streams to the supervisor
//!
//! The parent keeps the write end of stdin and the read ends of stdout and
//! stderr; [`ChildEnds`] carries the opposite ends into the spawn call, after
//! which the parent never sees them again. Every end is close-on-exec, and the
//! parent's ends are non-blocking so no read or write can stall the host.

use std::fs::File;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

use log::debug;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::errors::{Result, SupervisorError};
use crate::host::{Host, OutputStream};
use crate::utils::set_nonblocking;

/// Ends handed to the child, consumed by the spawn
#[derive(Debug)]
pub struct ChildEnds {
    pub stdin: OwnedFd,
    pub stdout: OwnedFd,
    pub stderr: OwnedFd,
}

/// Parent-side ends of the three pipes; `None` marks a closed slot
#[derive(Debug, Default)]
pub struct PipeSet {
    stdin: Option<File>,
    stdout: Option<File>,
    stderr: Option<File>,
}

fn open_pipe(stream: &'static str) -> Result<(OwnedFd, OwnedFd)> {
    pipe2(OFlag::O_CLOEXEC).map_err(|e| SupervisorError::PipeSetup {
        stream,
        source: e.into(),
    })
}

impl PipeSet {
    /// Create all three pipes. On failure nothing stays open.
    pub fn create() -> Result<(Self, ChildEnds)> {
        let (stdin_read, stdin_write) = open_pipe("stdin")?;
        let (stdout_read, stdout_write) = open_pipe("stdout")?;
        let (stderr_read, stderr_write) = open_pipe("stderr")?;

        for (stream, fd) in [
            ("stdin", &stdin_write),
            ("stdout", &stdout_read),
            ("stderr", &stderr_read),
        ] {
            set_nonblocking(fd.as_raw_fd())
                .map_err(|source| SupervisorError::PipeSetup { stream, source })?;
        }

        let pipes = PipeSet {
            stdin: Some(File::from(stdin_write)),
            stdout: Some(File::from(stdout_read)),
            stderr: Some(File::from(stderr_read)),
        };
        let child = ChildEnds {
            stdin: stdin_read,
            stdout: stdout_write,
            stderr: stderr_write,
        };
        Ok((pipes, child))
    }

    fn slot(&self, stream: OutputStream) -> &Option<File> {
        match stream {
            OutputStream::Stdout => &self.stdout,
            OutputStream::Stderr => &self.stderr,
        }
    }

    fn slot_mut(&mut self, stream: OutputStream) -> &mut Option<File> {
        match stream {
            OutputStream::Stdout => &mut self.stdout,
            OutputStream::Stderr => &mut self.stderr,
        }
    }

    /// Register both read ends with the host
    pub fn register(&self, host: &mut dyn Host) {
        for stream in OutputStream::ALL {
            if let Some(fd) = self.raw_fd(stream) {
                host.watch(fd, stream);
            }
        }
    }

    /// Read end of an output stream, if still open
    pub fn reader(&self, stream: OutputStream) -> Option<&File> {
        self.slot(stream).as_ref()
    }

    pub fn raw_fd(&self, stream: OutputStream) -> Option<RawFd> {
        self.reader(stream).map(AsRawFd::as_raw_fd)
    }

    pub fn is_open(&self, stream: OutputStream) -> bool {
        self.slot(stream).is_some()
    }

    /// Write end of the child's stdin, if still open
    pub fn stdin_mut(&mut self) -> Option<&mut File> {
        self.stdin.as_mut()
    }

    pub fn has_stdin(&self) -> bool {
        self.stdin.is_some()
    }

    /// Deregister and close one output pipe. Closed pipes are left alone.
    pub fn close(&mut self, host: &mut dyn Host, stream: OutputStream) {
        if let Some(file) = self.slot_mut(stream).take() {
            host.unwatch(file.as_raw_fd());
            debug!("closed {} pipe (fd {})", stream, file.as_raw_fd());
        }
    }

    /// Deregister and close everything still open. Safe to call repeatedly.
    pub fn release(&mut self, host: &mut dyn Host) {
        for stream in OutputStream::ALL {
            self.close(host, stream);
        }
        self.stdin.take();
    }

    /// True once every slot is closed
    pub fn is_released(&self) -> bool {
        self.stdin.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}
