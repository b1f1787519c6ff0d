/*!
 * procpipe
 * Thin, explicit wrappers over POSIX process and descriptor primitives
 *
 * - `io`: open, read, write, and close raw descriptors; create pipes
 * - `process`: spawn a child with optional stdio pipes, signal it, reap it
 * - `core`: the descriptor type and errno-carrying error type
 *
 * Every failing kernel call surfaces as a [`SyscallError`] naming the
 * operation and carrying the errno.
 */

pub mod config;
pub mod core;
pub mod io;
pub mod monitoring;
pub mod process;

// Re-exports
pub use crate::config::RuntimeConfig;
pub use crate::core::{Descriptor, Pid, SyscallError, SyscallResult};
pub use crate::io::{
    close, create_pipe, open, read, read_to_end, read_to_string, set_nonblocking, write, write_all,
    write_str, OpenFlags, Permissions, Pipe, ReadOutcome,
};
pub use crate::monitoring::init_tracing;
pub use crate::process::{
    Environment, ProcessHandle, ProcessState, SpawnConfig, WaitOutcome, WaitStatus,
};
