/*!
 * Process Module
 * Child process spawning with piped standard streams, signaling, and reaping
 */

pub mod handle;
pub mod plan;
pub mod types;

// Re-export for convenience
pub use handle::ProcessHandle;
pub use plan::{FileAction, SpawnPlan};
pub use types::{Environment, ProcessState, SpawnConfig, WaitOutcome, WaitStatus};
