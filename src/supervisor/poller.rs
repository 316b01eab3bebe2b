//! Exit poller with linear back-off

use std::time::Duration;

use log::{error, trace};

use super::Supervisor;
use crate::config::BackoffConfig;
use crate::execution::{EXIT_STATUS_UNKNOWN, exit_code};
use crate::host::Host;

/// Delay between exit checks: grows by a fixed step up to a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    delay: Duration,
    step: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            delay: config.initial.min(config.max),
            step: config.step,
            max: config.max,
        }
    }

    /// Current delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Grow the delay after a miss and return it
    pub fn advance(&mut self) -> Duration {
        self.delay = (self.delay + self.step).min(self.max);
        self.delay
    }
}

impl Supervisor {
    /// Non-blocking exit check; re-arms the timer while the child lives
    pub fn on_timer(&mut self, host: &mut dyn Host) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        match active.child.try_wait() {
            Ok(Some(status)) => {
                let code = exit_code(status);
                self.finish(host, code);
            }
            Ok(None) => {
                let delay = active.backoff.advance();
                trace!("pid {} still running, next check in {:?}", active.pid, delay);
                host.schedule(delay);
            }
            Err(e) => {
                error!("checking pid {} failed: {}", active.pid, e);
                self.finish(host, EXIT_STATUS_UNKNOWN);
            }
        }
    }
}
