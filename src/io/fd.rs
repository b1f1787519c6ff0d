/*!
 * File Descriptor Operations
 * open / close / read / write with errno translation
 *
 * Every call is a single, synchronous syscall on the calling thread. Partial
 * writes are exposed as-is; `write_all` is the looping helper for callers that
 * need a full transfer.
 */

use super::open_flags::OpenFlags;
use super::permissions::Permissions;
use crate::core::{check, to_cstring, Descriptor, SyscallError, SyscallResult};
use nix::errno::Errno;
use std::path::Path;
use tracing::{debug, trace};

/// Chunk size used by the draining helpers
pub const READ_CHUNK: usize = 8 * 1024;

/// Largest buffer a single `read` allocates; larger requests may return fewer bytes
pub const MAX_READ_BUFFER: usize = 1024 * 1024;

/// Outcome of a single `read`
///
/// End-of-file and would-block are expected results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one byte was transferred (or zero bytes were requested)
    Data(Vec<u8>),
    /// Non-blocking descriptor with nothing available yet
    WouldBlock,
    /// No more data will ever arrive
    EndOfFile,
}

impl ReadOutcome {
    #[inline]
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    #[inline]
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    /// The transferred bytes, if any
    #[must_use]
    pub fn into_data(self) -> Option<Vec<u8>> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Open `path` and return a new descriptor
///
/// `permissions` is only consulted when the flags may create the file;
/// it defaults to `0o644` in that case.
pub fn open(
    path: impl AsRef<Path>,
    flags: OpenFlags,
    permissions: Option<Permissions>,
) -> SyscallResult<Descriptor> {
    flags.validate()?;
    let path = path.as_ref();
    let c_path = to_cstring("path", path.as_os_str())?;
    let raw_flags = flags.to_raw();

    let fd = if flags.will_create() {
        let mode = permissions.unwrap_or_default().to_raw();
        unsafe { libc::open(c_path.as_ptr(), raw_flags, libc::c_uint::from(mode)) }
    } else {
        unsafe { libc::open(c_path.as_ptr(), raw_flags) }
    };
    let fd = check("open", fd)?;

    debug!(path = %path.display(), fd, flags = raw_flags, "opened descriptor");
    Ok(Descriptor::from_raw(fd))
}

/// Close a descriptor
///
/// Closing the invalid sentinel is a no-op, and a descriptor that is already
/// closed (`EBADF`) is accepted silently. Other failures propagate.
pub fn close(fd: Descriptor) -> SyscallResult<()> {
    if !fd.is_valid() {
        return Ok(());
    }

    match Errno::result(unsafe { libc::close(fd.as_raw()) }) {
        Ok(_) => {
            trace!(%fd, "closed descriptor");
            Ok(())
        }
        Err(Errno::EBADF) => {
            debug!(%fd, "descriptor already closed");
            Ok(())
        }
        Err(errno) => Err(SyscallError::system("close", errno)),
    }
}

/// Read up to `max_bytes` from `fd`
///
/// Requesting zero bytes never touches the kernel. A zero-byte transfer is
/// reported as [`ReadOutcome::EndOfFile`]; `EAGAIN` on a non-blocking
/// descriptor as [`ReadOutcome::WouldBlock`]. Counts above `isize::MAX` are
/// rejected; at most [`MAX_READ_BUFFER`] bytes are returned per call.
pub fn read(fd: Descriptor, max_bytes: usize) -> SyscallResult<ReadOutcome> {
    if max_bytes == 0 {
        return Ok(ReadOutcome::Data(Vec::new()));
    }
    if max_bytes > isize::MAX as usize {
        return Err(SyscallError::invalid_argument(format!(
            "read of {} bytes exceeds the largest representable count",
            max_bytes
        )));
    }

    let mut buf = vec![0u8; max_bytes.min(MAX_READ_BUFFER)];
    let ret = unsafe { libc::read(fd.as_raw(), buf.as_mut_ptr().cast(), buf.len()) };
    match Errno::result(ret) {
        Ok(0) => Ok(ReadOutcome::EndOfFile),
        Ok(n) => {
            buf.truncate(n as usize);
            Ok(ReadOutcome::Data(buf))
        }
        Err(Errno::EAGAIN) => Ok(ReadOutcome::WouldBlock),
        Err(errno) => Err(SyscallError::system("read", errno)),
    }
}

/// Write `bytes` with a single syscall and return how many were accepted
///
/// The count may be smaller than `bytes.len()`. An empty slice returns 0
/// without a syscall.
pub fn write(fd: Descriptor, bytes: &[u8]) -> SyscallResult<usize> {
    if bytes.is_empty() {
        return Ok(0);
    }

    let ret = unsafe { libc::write(fd.as_raw(), bytes.as_ptr().cast(), bytes.len()) };
    let written = check("write", ret)? as usize;
    if written < bytes.len() {
        trace!(%fd, written, requested = bytes.len(), "partial write");
    }
    Ok(written)
}

/// Write every byte of `bytes`, looping over partial writes
pub fn write_all(fd: Descriptor, bytes: &[u8]) -> SyscallResult<()> {
    let mut written = 0;
    while written < bytes.len() {
        match write(fd, &bytes[written..])? {
            0 => {
                return Err(SyscallError::WriteZero {
                    written,
                    expected: bytes.len(),
                })
            }
            n => written += n,
        }
    }
    Ok(())
}

/// Write UTF-8 text in full
#[inline]
pub fn write_str(fd: Descriptor, text: &str) -> SyscallResult<()> {
    write_all(fd, text.as_bytes())
}

/// Read until end-of-file
///
/// Meant for blocking descriptors. Hitting would-block partway fails with
/// `EAGAIN` rather than spinning.
pub fn read_to_end(fd: Descriptor) -> SyscallResult<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        match read(fd, READ_CHUNK)? {
            ReadOutcome::Data(chunk) => out.extend_from_slice(&chunk),
            ReadOutcome::EndOfFile => return Ok(out),
            ReadOutcome::WouldBlock => return Err(SyscallError::system("read", Errno::EAGAIN)),
        }
    }
}

/// Read until end-of-file and decode as UTF-8
pub fn read_to_string(fd: Descriptor) -> SyscallResult<String> {
    let bytes = read_to_end(fd)?;
    String::from_utf8(bytes).map_err(|e| {
        SyscallError::encoding(format!("data read from {} is not valid UTF-8: {}", fd, e.utf8_error()))
    })
}

/// Toggle `O_NONBLOCK` on an open descriptor
pub fn set_nonblocking(fd: Descriptor, nonblocking: bool) -> SyscallResult<()> {
    let flags = check("fcntl", unsafe { libc::fcntl(fd.as_raw(), libc::F_GETFL) })?;
    let updated = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if updated != flags {
        check("fcntl", unsafe { libc::fcntl(fd.as_raw(), libc::F_SETFL, updated) })?;
    }
    Ok(())
}

/// Set `FD_CLOEXEC` so the descriptor does not survive exec
pub fn set_close_on_exec(fd: Descriptor) -> SyscallResult<()> {
    let flags = check("fcntl", unsafe { libc::fcntl(fd.as_raw(), libc::F_GETFD) })?;
    if flags & libc::FD_CLOEXEC == 0 {
        check("fcntl", unsafe {
            libc::fcntl(fd.as_raw(), libc::F_SETFD, flags | libc::FD_CLOEXEC)
        })?;
    }
    Ok(())
}
