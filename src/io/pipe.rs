/*!
 * Pipes
 * Kernel pipe creation returning a connected descriptor pair
 */

use super::fd::close;
use crate::core::{check, Descriptor, SyscallResult};
use serde::{Deserialize, Serialize};
use std::os::unix::io::RawFd;
use tracing::trace;

/// A connected, unidirectional descriptor pair
///
/// Bytes written to `write_end` come out of `read_end` in order. The read end
/// reports end-of-file once every write end, in every process, is closed and
/// the buffered bytes are drained. Both ends are created close-on-exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipe {
    pub read_end: Descriptor,
    pub write_end: Descriptor,
}

impl Pipe {
    /// Close both ends. Both are attempted; the first failure is returned.
    pub fn close(self) -> SyscallResult<()> {
        let read = close(self.read_end);
        let write = close(self.write_end);
        read.and(write)
    }
}

/// Create a pipe with one kernel call
///
/// On failure no descriptor exists and nothing needs cleanup.
pub fn create_pipe() -> SyscallResult<Pipe> {
    let fds = raw_pipe()?;
    let pipe = Pipe {
        read_end: Descriptor::from_raw(fds[0]),
        write_end: Descriptor::from_raw(fds[1]),
    };
    trace!(read_end = %pipe.read_end, write_end = %pipe.write_end, "created pipe");
    Ok(pipe)
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos"
))]
fn raw_pipe() -> SyscallResult<[RawFd; 2]> {
    let mut fds: [RawFd; 2] = [-1; 2];
    check("pipe", unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    Ok(fds)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos"
)))]
fn raw_pipe() -> SyscallResult<[RawFd; 2]> {
    use super::fd::set_close_on_exec;

    let mut fds: [RawFd; 2] = [-1; 2];
    check("pipe", unsafe { libc::pipe(fds.as_mut_ptr()) })?;
    let pipe = Pipe {
        read_end: Descriptor::from_raw(fds[0]),
        write_end: Descriptor::from_raw(fds[1]),
    };
    if let Err(e) = set_close_on_exec(pipe.read_end).and_then(|_| set_close_on_exec(pipe.write_end)) {
        let _ = pipe.close();
        return Err(e);
    }
    Ok(fds)
}
