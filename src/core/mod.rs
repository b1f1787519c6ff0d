/*!
 * Core Module
 * Descriptor type, errno translation, and owned C string arrays
 */

pub mod cstring;
pub mod errors;
pub mod serde;
pub mod types;

// Re-export for convenience
pub use cstring::{to_cstring, CStringArray};
pub use errors::{check, check_code, SyscallError, SyscallResult};
pub use types::{Descriptor, Pid};
