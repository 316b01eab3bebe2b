//! Privilege and scheduling reset applied in the child before exec
//!
//! Everything here runs between fork and exec, so it only uses
//! async-signal-safe libc calls and never allocates.

/// Put the child back on the default time-sharing policy at priority 0, in
/// case the supervisor itself runs with a realtime scheduler.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub fn drop_priority() {
    // SAFETY: zeroed sched_param is valid; sched_setscheduler only affects this process.
    unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = 0;
        libc::sched_setscheduler(0, libc::SCHED_OTHER, &param);
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub fn drop_priority() {}

/// Give up setuid/setgid privileges: effective ids become the real ids.
///
/// Group first, since changing the effective user may remove the right to
/// change the group afterwards.
pub fn drop_privileges() -> Result<(), &'static str> {
    // SAFETY: plain id syscalls without memory arguments.
    unsafe {
        if libc::setegid(libc::getgid()) == -1 {
            return Err("setegid failed\n");
        }
        if libc::seteuid(libc::getuid()) == -1 {
            return Err("seteuid failed\n");
        }
    }
    Ok(())
}

/// Restore the default SIGINT action; an ignored disposition survives exec.
pub fn reset_interrupt() {
    // SAFETY: installing SIG_DFL is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

/// Write a diagnostic to fd 2 without allocating
pub fn report(message: &str) {
    // SAFETY: writes a valid buffer to stderr; a short write is acceptable.
    unsafe {
        libc::write(
            libc::STDERR_FILENO,
            message.as_ptr() as *const libc::c_void,
            message.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::wait::{WaitStatus, waitpid};
    use nix::unistd::{ForkResult, fork};

    #[test]
    fn drop_privileges_without_setuid_keeps_ids() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let code = match drop_privileges() {
                    Ok(()) if unsafe { libc::geteuid() == libc::getuid() } => 0,
                    _ => 1,
                };
                unsafe { libc::_exit(code) };
            }
            Ok(ForkResult::Parent { child }) => {
                assert!(matches!(waitpid(child, None), Ok(WaitStatus::Exited(_, 0))));
            }
            Err(e) => panic!("fork failed: {}", e),
        }
    }

    #[test]
    fn drop_priority_does_not_kill_child() {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                drop_priority();
                unsafe { libc::_exit(3) };
            }
            Ok(ForkResult::Parent { child }) => {
                assert!(matches!(waitpid(child, None), Ok(WaitStatus::Exited(_, 3))));
            }
            Err(e) => panic!("fork failed: {}", e),
        }
    }
}
