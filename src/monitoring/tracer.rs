/*!
 * Tracing
 * Subscriber setup and timed spans around process syscalls
 *
 * Spans carry a process-wide sequence number so that the log lines for one
 * spawn or wait can be correlated when several children are in flight.
 */

use crate::config::RuntimeConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Syscalls slower than this are logged at warn level
pub const SLOW_SYSCALL: Duration = Duration::from_millis(10);

static NEXT_SPAN_ID: AtomicU64 = AtomicU64::new(1);

/// Install the global subscriber
///
/// Logs go to stderr so they never mix with relayed child output on stdout.
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(config: &RuntimeConfig) -> bool {
    let env_filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.trace_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        debug!(filter = %config.log_filter, json = config.trace_json, "tracing initialized");
    }
    installed
}

/// Next span sequence number
pub fn next_span_id() -> u64 {
    NEXT_SPAN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Timed span around one process syscall
///
/// The elapsed time is logged when the span is dropped. Long waits are
/// expected for `waitpid`, so slow-call warnings only apply when
/// `warn_if_slow` is set.
pub struct SyscallSpan {
    span: tracing::Span,
    start: Instant,
    syscall: &'static str,
    id: u64,
    warn_if_slow: bool,
}

impl SyscallSpan {
    pub fn new(syscall: &'static str, pid: libc::pid_t, warn_if_slow: bool) -> Self {
        let id = next_span_id();
        let span = span!(
            Level::DEBUG,
            "syscall",
            span_id = id,
            syscall,
            pid,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            syscall,
            id,
            warn_if_slow,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Set the pid once it is known (after `posix_spawn`)
    pub fn record_pid(&self, pid: libc::pid_t) {
        self.span.record("pid", pid);
    }

    pub fn record_result(&self, success: bool) {
        self.span.record("result", if success { "success" } else { "error" });
    }

    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "error");
    }
}

impl Drop for SyscallSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        if self.warn_if_slow && elapsed > SLOW_SYSCALL {
            warn!(
                span_id = self.id,
                syscall = self.syscall,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow syscall"
            );
        } else {
            debug!(
                span_id = self.id,
                syscall = self.syscall,
                duration_us = elapsed.as_micros() as u64,
                "syscall completed"
            );
        }
    }
}

/// Span for a syscall that should finish quickly
#[inline]
pub fn span_syscall(syscall: &'static str, pid: libc::pid_t) -> SyscallSpan {
    SyscallSpan::new(syscall, pid, true)
}

/// Span for a blocking syscall whose duration depends on another process
#[inline]
pub fn span_blocking(syscall: &'static str, pid: libc::pid_t) -> SyscallSpan {
    SyscallSpan::new(syscall, pid, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_ids_increase() {
        let a = span_syscall("posix_spawn", 0);
        let b = span_blocking("waitpid", 1);
        assert!(b.id() > a.id());
        a.record_result(true);
        b.record_error("ECHILD");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = RuntimeConfig::default();
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
