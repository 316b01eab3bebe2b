//! Output reader
//!
//! One read per readiness notification. A read that returns nothing means the
//! child closed that stream; only that pipe is torn down.

use std::io::{ErrorKind, Read};
use std::os::unix::io::AsFd;

use log::{error, info, trace};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use super::Supervisor;
use crate::host::{Host, OutputStream};

/// Size of the per-read buffer; one byte is kept spare
pub const READ_BUFFER_SIZE: usize = 65536;

impl Supervisor {
    /// Read once from `stream` and emit the framed messages on its outlet
    pub fn on_readable(&mut self, host: &mut dyn Host, stream: OutputStream) {
        let Some(active) = self.active.as_mut() else {
            trace!("{} readable with no process", stream);
            return;
        };
        let Some(mut reader) = active.pipes.reader(stream) else {
            return;
        };

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        match reader.read(&mut buf[..READ_BUFFER_SIZE - 1]) {
            Ok(0) => {
                info!("EOF on {} of pid {}", stream, active.pid);
                active.pipes.close(host, stream);
            }
            Ok(n) => {
                trace!("read {} bytes from {}", n, stream);
                for message in active.mode.frame(&buf[..n]) {
                    host.emit(stream.outlet(), message);
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                trace!("spurious wakeup on {}", stream);
            }
            Err(e) => {
                error!("read from {} of pid {} failed: {}", stream, active.pid, e);
                active.pipes.close(host, stream);
            }
        }
    }

    /// Give each open pipe with data (or EOF) pending one read
    pub(crate) fn drain_ready(&mut self, host: &mut dyn Host) {
        for stream in OutputStream::ALL {
            if self.stream_ready(stream) {
                self.on_readable(host, stream);
            }
        }
    }

    fn stream_ready(&self, stream: OutputStream) -> bool {
        let Some(file) = self.pipes().and_then(|pipes| pipes.reader(stream)) else {
            return false;
        };
        let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
        matches!(poll(&mut fds, PollTimeout::ZERO), Ok(n) if n > 0)
    }
}
