/*!
 * Process Types
 * Spawn configuration, environments, and decoded wait statuses
 */

use crate::core::serde::is_false;
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// Explicit environment for a child process
///
/// Passing `None` where an `Option<&Environment>` is expected means "inherit
/// the parent's environment". Passing an empty `Environment` means the child
/// sees no variables at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An environment with no variables
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Everything needed to spawn one child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpawnConfig {
    pub path: PathBuf,
    /// Full argument vector; the first entry is conventionally the program name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// `None` inherits the parent's environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Environment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub redirect: bool,
}

impl SpawnConfig {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: vec![],
            env: None,
            redirect: false,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn inherit_env(mut self) -> Self {
        self.env = None;
        self
    }

    #[must_use]
    pub fn with_redirect(mut self, redirect: bool) -> Self {
        self.redirect = redirect;
        self
    }

    /// Arguments as OS strings, in order
    pub fn os_args(&self) -> Vec<OsString> {
        self.args.iter().map(OsString::from).collect()
    }
}

/// Lifecycle of a [`super::ProcessHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Running,
    Waited,
}

/// Tri-state view of a wait status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum WaitOutcome {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
    /// Status the kernel encoded in a way none of the views decode
    Unknown(i32),
}

/// Kernel-encoded status returned by `waitpid`
///
/// Exactly one of `exit_code`, `terminating_signal` and `stopping_signal`
/// returns `Some` for a status produced by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaitStatus(i32);

impl WaitStatus {
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Exit code if the child exited normally
    #[must_use]
    pub fn exit_code(self) -> Option<i32> {
        libc::WIFEXITED(self.0).then(|| libc::WEXITSTATUS(self.0))
    }

    /// Signal number if the child was terminated by a signal
    #[must_use]
    pub fn terminating_signal(self) -> Option<i32> {
        libc::WIFSIGNALED(self.0).then(|| libc::WTERMSIG(self.0))
    }

    /// Signal number if the child is stopped
    #[must_use]
    pub fn stopping_signal(self) -> Option<i32> {
        libc::WIFSTOPPED(self.0).then(|| libc::WSTOPSIG(self.0))
    }

    #[must_use]
    pub fn core_dumped(self) -> bool {
        libc::WIFSIGNALED(self.0) && libc::WCOREDUMP(self.0)
    }

    /// Exited with code 0
    #[must_use]
    pub fn success(self) -> bool {
        self.exit_code() == Some(0)
    }

    #[must_use]
    pub fn outcome(self) -> WaitOutcome {
        if let Some(code) = self.exit_code() {
            WaitOutcome::Exited(code)
        } else if let Some(signal) = self.terminating_signal() {
            WaitOutcome::Signaled(signal)
        } else if let Some(signal) = self.stopping_signal() {
            WaitOutcome::Stopped(signal)
        } else {
            WaitOutcome::Unknown(self.0)
        }
    }
}

/// Conventional name of a signal number, or "unknown" for numbers without one
pub(crate) fn signal_name(signal: i32) -> &'static str {
    Signal::try_from(signal).map(Signal::as_str).unwrap_or("unknown")
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome() {
            WaitOutcome::Exited(code) => write!(f, "exited with code {}", code),
            WaitOutcome::Signaled(signal) => {
                write!(f, "terminated by signal {} ({})", signal, signal_name(signal))?;
                if self.core_dumped() {
                    f.write_str(", core dumped")?;
                }
                Ok(())
            }
            WaitOutcome::Stopped(signal) => {
                write!(f, "stopped by signal {} ({})", signal, signal_name(signal))
            }
            WaitOutcome::Unknown(raw) => write!(f, "unrecognized wait status {:#x}", raw),
        }
    }
}
