/*!
 * C String Arrays
 * Owned, NULL-terminated `argv`/`envp` vectors for exec-family calls
 */

use super::errors::{SyscallError, SyscallResult};
use std::ffi::{CStr, CString, OsStr};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::ptr;

/// Convert one OS string into a `CString`, naming the offending input on failure
pub fn to_cstring(what: &str, value: &OsStr) -> SyscallResult<CString> {
    CString::new(value.as_bytes()).map_err(|e| {
        SyscallError::encoding(format!(
            "{} {:?} contains an interior NUL byte at index {}",
            what,
            value,
            e.nul_position()
        ))
    })
}

/// Owned sequence of C strings plus the pointer table the kernel expects
///
/// The pointer table always ends with a NULL entry. Both the strings and the
/// table are freed when the array is dropped, on every exit path.
pub struct CStringArray {
    items: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringArray {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut ptrs = Vec::with_capacity(capacity + 1);
        ptrs.push(ptr::null());
        Self {
            items: Vec::with_capacity(capacity),
            ptrs,
        }
    }

    /// Append one entry, keeping the table NULL-terminated
    pub fn push(&mut self, item: CString) {
        let last = self.ptrs.len() - 1;
        // The CString's heap buffer does not move when the CString itself is moved.
        self.ptrs[last] = item.as_ptr();
        self.ptrs.push(ptr::null());
        self.items.push(item);
    }

    /// Build an argument vector
    pub fn from_args<I, S>(args: I) -> SyscallResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let iter = args.into_iter();
        let mut array = Self::with_capacity(iter.size_hint().0);
        for arg in iter {
            array.push(to_cstring("argument", arg.as_ref())?);
        }
        Ok(array)
    }

    /// Build an environment vector of `NAME=value` entries
    ///
    /// Names must be non-empty and must not contain `=`.
    pub fn from_pairs<I, K, V>(pairs: I) -> SyscallResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let iter = pairs.into_iter();
        let mut array = Self::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            let key = key.as_ref();
            if key.is_empty() || key.as_bytes().contains(&b'=') {
                return Err(SyscallError::invalid_argument(format!(
                    "environment variable name {:?} must be non-empty and must not contain '='",
                    key
                )));
            }
            array.push_entry(key, value.as_ref())?;
        }
        Ok(array)
    }

    /// Snapshot of the current process environment
    ///
    /// Entries are copied as the platform reports them, without name checks,
    /// so an unusual inherited name never blocks a spawn.
    pub fn inherited() -> SyscallResult<Self> {
        Self::from_raw_pairs(std::env::vars_os())
    }

    fn from_raw_pairs<I, K, V>(pairs: I) -> SyscallResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let iter = pairs.into_iter();
        let mut array = Self::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            array.push_entry(key.as_ref(), value.as_ref())?;
        }
        Ok(array)
    }

    fn push_entry(&mut self, key: &OsStr, value: &OsStr) -> SyscallResult<()> {
        let mut entry = Vec::with_capacity(key.len() + value.len() + 1);
        entry.extend_from_slice(key.as_bytes());
        entry.push(b'=');
        entry.extend_from_slice(value.as_bytes());
        self.push(to_cstring("environment entry", OsStr::from_bytes(&entry))?);
        Ok(())
    }

    /// Pointer to the NULL-terminated table, valid while `self` is alive
    #[inline]
    pub fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.items.iter().map(CString::as_c_str)
    }
}

impl fmt::Debug for CStringArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
