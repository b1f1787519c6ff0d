/*!
 * Open Flags
 * Typed flag set for `open(2)` and its mapping to raw `O_*` bits
 */

use crate::core::serde::is_false;
use crate::core::{SyscallError, SyscallResult};
use serde::{Deserialize, Serialize};

/// File open flags (only set flags are serialized)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct OpenFlags {
    #[serde(skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub write: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub append: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub truncate: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub create: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub create_new: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub nonblocking: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub close_on_exec: bool,
}

impl OpenFlags {
    #[inline]
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Create or truncate for writing (`O_WRONLY | O_CREAT | O_TRUNC`)
    #[inline]
    #[must_use]
    pub fn create() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Create exclusively, failing if the file exists
    #[inline]
    #[must_use]
    pub fn create_new() -> Self {
        Self {
            write: true,
            create_new: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn append_only() -> Self {
        Self {
            write: true,
            append: true,
            ..Default::default()
        }
    }

    /// Reads on the resulting descriptor report would-block instead of waiting
    #[inline]
    #[must_use]
    pub fn with_nonblocking(mut self) -> Self {
        self.nonblocking = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_close_on_exec(mut self) -> Self {
        self.close_on_exec = true;
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.write || self.append
    }

    /// Whether `open` may create the file (and so needs a mode)
    #[inline]
    #[must_use]
    pub const fn will_create(&self) -> bool {
        self.create || self.create_new
    }

    /// Convert to the raw `O_*` bit set
    pub fn to_raw(&self) -> libc::c_int {
        let mut flags = match (self.read, self.is_writable()) {
            (true, true) => libc::O_RDWR,
            (false, true) => libc::O_WRONLY,
            _ => libc::O_RDONLY,
        };

        if self.append {
            flags |= libc::O_APPEND;
        }
        if self.truncate {
            flags |= libc::O_TRUNC;
        }
        if self.create {
            flags |= libc::O_CREAT;
        }
        if self.create_new {
            flags |= libc::O_CREAT | libc::O_EXCL;
        }
        if self.nonblocking {
            flags |= libc::O_NONBLOCK;
        }
        if self.close_on_exec {
            flags |= libc::O_CLOEXEC;
        }

        flags
    }

    /// Decode a raw `O_*` bit set
    pub fn from_raw(flags: libc::c_int) -> Self {
        let access_mode = flags & libc::O_ACCMODE;
        let create = flags & libc::O_CREAT != 0;
        let exclusive = flags & libc::O_EXCL != 0;

        Self {
            read: access_mode == libc::O_RDONLY || access_mode == libc::O_RDWR,
            write: access_mode == libc::O_WRONLY || access_mode == libc::O_RDWR,
            append: flags & libc::O_APPEND != 0,
            truncate: flags & libc::O_TRUNC != 0,
            create: create && !exclusive,
            create_new: create && exclusive,
            nonblocking: flags & libc::O_NONBLOCK != 0,
            close_on_exec: flags & libc::O_CLOEXEC != 0,
        }
    }

    /// Validate flag combinations
    #[must_use = "validation result must be checked"]
    pub fn validate(&self) -> SyscallResult<()> {
        if !self.read && !self.is_writable() {
            return Err(SyscallError::invalid_argument(
                "open flags must request read or write access",
            ));
        }
        if self.create_new && !self.is_writable() {
            return Err(SyscallError::invalid_argument(
                "create_new requires write access",
            ));
        }
        if self.truncate && !self.is_writable() {
            return Err(SyscallError::invalid_argument(
                "truncate requires write access",
            ));
        }
        if self.append && self.truncate {
            return Err(SyscallError::invalid_argument(
                "cannot use both append and truncate",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_flags() {
        let flags = OpenFlags::read_only();
        assert!(flags.read);
        assert!(!flags.is_writable());

        let flags = OpenFlags::create();
        assert!(flags.write);
        assert!(flags.will_create());

        let flags = OpenFlags::append_only();
        assert!(flags.is_writable());
        assert!(!flags.will_create());
    }

    #[test]
    fn test_to_raw_access_modes() {
        assert_eq!(OpenFlags::read_only().to_raw(), libc::O_RDONLY);
        assert_eq!(OpenFlags::write_only().to_raw(), libc::O_WRONLY);
        assert_eq!(OpenFlags::read_write().to_raw(), libc::O_RDWR);

        let raw = OpenFlags::create_new().to_raw();
        assert_eq!(raw & libc::O_EXCL, libc::O_EXCL);
        assert_eq!(raw & libc::O_CREAT, libc::O_CREAT);

        let raw = OpenFlags::read_only().with_nonblocking().to_raw();
        assert_eq!(raw & libc::O_NONBLOCK, libc::O_NONBLOCK);
    }

    #[test]
    fn test_raw_round_trip() {
        let original = OpenFlags::create().with_close_on_exec();
        assert_eq!(OpenFlags::from_raw(original.to_raw()), original);

        let original = OpenFlags::create_new();
        assert_eq!(OpenFlags::from_raw(original.to_raw()), original);
    }

    #[test]
    fn test_open_flags_serialization() {
        let flags = OpenFlags::read_only();
        let json = serde_json::to_string(&flags).unwrap();
        assert!(json.contains("\"read\":true"));
        assert!(!json.contains("write"));

        let deserialized: OpenFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, deserialized);
    }

    #[test]
    fn test_open_flags_validation() {
        assert!(OpenFlags::create_new().validate().is_ok());
        assert!(OpenFlags::default().validate().is_err());

        let flags = OpenFlags {
            read: true,
            create_new: true,
            ..Default::default()
        };
        assert!(flags.validate().is_err());

        let flags = OpenFlags {
            read: true,
            truncate: true,
            ..Default::default()
        };
        assert!(flags.validate().is_err());

        let flags = OpenFlags {
            write: true,
            append: true,
            truncate: true,
            ..Default::default()
        };
        assert!(matches!(
            flags.validate(),
            Err(SyscallError::InvalidArgument(_))
        ));
    }
}
