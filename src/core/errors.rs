/*!
 * Error Types
 * Errno translation and structured errors for every syscall boundary
 */

use super::types::Pid;
use miette::Diagnostic;
use nix::errno::{Errno, ErrnoSentinel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for descriptor and process operations
pub type SyscallResult<T> = Result<T, SyscallError>;

/// Errors surfaced by descriptor, pipe and process operations
///
/// Kernel failures always carry the raw errno value and the name of the
/// call that produced it. Serialization uses the tagged enum pattern.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error_type", content = "details")]
#[non_exhaustive]
pub enum SyscallError {
    /// The kernel reported a failure
    #[error("{operation} failed: {message}")]
    #[diagnostic(
        code(syscall::system),
        help("The kernel rejected the call. `code` holds the raw errno value.")
    )]
    System {
        operation: String,
        code: i32,
        message: String,
    },

    /// The child has already been reaped through this handle
    #[error("Process {pid} has already been waited on")]
    #[diagnostic(
        code(process::already_waited),
        help("A child can only be reaped once. Keep the status from the first wait.")
    )]
    AlreadyWaited { pid: Pid },

    /// Text could not be represented in the required encoding
    #[error("Encoding error: {0}")]
    #[diagnostic(code(syscall::encoding))]
    Encoding(String),

    /// Arguments rejected before reaching the kernel
    #[error("Invalid argument: {0}")]
    #[diagnostic(code(syscall::invalid_argument))]
    InvalidArgument(String),

    /// A looping write stopped making progress
    #[error("Short write: {written} of {expected} bytes accepted before the descriptor stalled")]
    #[diagnostic(
        code(io::write_zero),
        help("The descriptor accepted zero bytes. The reader may have gone away.")
    )]
    WriteZero { written: usize, expected: usize },
}

impl SyscallError {
    /// Build a kernel error from an errno value
    #[inline]
    pub fn system(operation: &str, errno: Errno) -> Self {
        Self::from_code(operation, errno as i32)
    }

    /// Build a kernel error from a raw error code (as returned by `posix_spawn`)
    pub fn from_code(operation: &str, code: i32) -> Self {
        Self::System {
            operation: operation.to_string(),
            code,
            message: std::io::Error::from_raw_os_error(code).to_string(),
        }
    }

    #[inline]
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Raw errno value for kernel failures
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::System { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Name of the failing call for kernel failures
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::System { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Whether this is a kernel failure with the given errno
    #[must_use]
    pub fn is_errno(&self, errno: Errno) -> bool {
        self.code() == Some(errno as i32)
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.is_errno(Errno::ENOENT)
    }
}

/// Translate a sentinel-style return value (`-1` + errno) into a result
///
/// Must be called immediately after the syscall, before anything else can
/// overwrite errno.
#[inline]
pub fn check<S>(operation: &str, value: S) -> SyscallResult<S>
where
    S: ErrnoSentinel + PartialEq<S>,
{
    Errno::result(value).map_err(|errno| SyscallError::system(operation, errno))
}

/// Translate a call that returns its error code directly (`0` on success)
#[inline]
pub fn check_code(operation: &str, code: libc::c_int) -> SyscallResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(SyscallError::from_code(operation, code))
    }
}
