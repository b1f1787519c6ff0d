/*!
 * I/O Module
 * Descriptor-level file operations and pipes
 */

pub mod fd;
pub mod open_flags;
pub mod permissions;
pub mod pipe;

// Re-export for convenience
pub use fd::{
    close, open, read, read_to_end, read_to_string, set_close_on_exec, set_nonblocking, write,
    write_all, write_str, ReadOutcome, MAX_READ_BUFFER, READ_CHUNK,
};
pub use open_flags::OpenFlags;
pub use permissions::Permissions;
pub use pipe::{create_pipe, Pipe};
