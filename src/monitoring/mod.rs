/*!
 * Monitoring
 * Tracing subscriber setup and syscall spans
 */

mod tracer;

pub use tracer::{init_tracing, next_span_id, span_blocking, span_syscall, SyscallSpan, SLOW_SYSCALL};
