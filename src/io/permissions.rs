/*!
 * File Permissions
 * Unix-style mode bits applied when `open` creates a file
 */

use serde::{Deserialize, Deserializer, Serialize};

/// File permissions (Unix-style) with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(deserialize_with = "deserialize_permission_mode")]
    pub mode: u32,
}

impl Permissions {
    /// Create permissions, masking to valid mode bits
    #[inline]
    #[must_use]
    pub const fn new(mode: u32) -> Self {
        Self {
            mode: mode & 0o7777,
        }
    }

    /// Owner-only read/write (0o600)
    #[inline]
    #[must_use]
    pub const fn private() -> Self {
        Self { mode: 0o600 }
    }

    /// Read-only for everyone (0o444)
    #[inline]
    #[must_use]
    pub const fn readonly() -> Self {
        Self { mode: 0o444 }
    }

    /// Owner read-write, others read (0o644)
    #[inline]
    #[must_use]
    pub const fn readwrite() -> Self {
        Self { mode: 0o644 }
    }

    /// Executable (0o755)
    #[inline]
    #[must_use]
    pub const fn executable() -> Self {
        Self { mode: 0o755 }
    }

    #[inline]
    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.mode & 0o222 == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }

    /// Mode as passed to `open(2)`
    #[inline]
    #[must_use]
    pub const fn to_raw(&self) -> libc::mode_t {
        self.mode as libc::mode_t
    }
}

/// Deserialize and validate permission mode (must be <= 0o7777)
fn deserialize_permission_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let mode = u32::deserialize(deserializer)?;
    if mode > 0o7777 {
        return Err(serde::de::Error::custom(format!(
            "invalid permission mode: 0o{:o} exceeds maximum 0o7777",
            mode
        )));
    }
    Ok(mode)
}

impl Default for Permissions {
    fn default() -> Self {
        Self::readwrite()
    }
}
