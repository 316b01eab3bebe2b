//! Small OS helpers shared by the pipe set and the spawn path

use std::io;
use std::os::unix::io::RawFd;

/// Real user id of this process
pub fn get_uid() -> u32 {
    unsafe { libc::getuid() }
}

/// Effective user id of this process
pub fn get_euid() -> u32 {
    unsafe { libc::geteuid() }
}

/// Real group id of this process
pub fn get_gid() -> u32 {
    unsafe { libc::getgid() }
}

/// Effective group id of this process
pub fn get_egid() -> u32 {
    unsafe { libc::getegid() }
}

/// True when running with setuid/setgid privileges that children must not inherit
pub fn is_elevated() -> bool {
    get_euid() != get_uid() || get_egid() != get_gid()
}

/// Put a descriptor into non-blocking mode
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on a descriptor owned by the caller; only status flags change.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
