/*!
 * Core Types
 * Descriptor handles and process identity
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::io::{AsRawFd, RawFd};

/// Kernel process ID
pub type Pid = libc::pid_t;

/// Opaque handle to a kernel I/O resource
///
/// A `Descriptor` is a plain number. Copying it never duplicates the resource,
/// dropping it never closes anything, and holding one says nothing about
/// whether the resource behind it is still open. Closing is done explicitly
/// through [`crate::io::close`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(RawFd);

impl Descriptor {
    /// Sentinel that never names a resource
    pub const INVALID: Self = Self(-1);

    pub const STDIN: Self = Self(libc::STDIN_FILENO);
    pub const STDOUT: Self = Self(libc::STDOUT_FILENO);
    pub const STDERR: Self = Self(libc::STDERR_FILENO);

    /// Wrap a raw descriptor number. Every negative number maps to [`Descriptor::INVALID`].
    #[inline]
    #[must_use]
    pub const fn from_raw(fd: RawFd) -> Self {
        if fd < 0 {
            Self::INVALID
        } else {
            Self(fd)
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_raw(self) -> RawFd {
        self.0
    }

    /// Whether the number is usable; says nothing about liveness
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// One of the three standard stream numbers (0, 1, 2)
    #[inline]
    #[must_use]
    pub const fn is_standard(self) -> bool {
        self.0 >= 0 && self.0 <= 2
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::INVALID
    }
}

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "fd {}", self.0)
        } else {
            f.write_str("fd <invalid>")
        }
    }
}
