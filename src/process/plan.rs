/*!
 * Spawn Plan
 * Child-side descriptor remapping, rendered into posix_spawn file actions
 *
 * For each redirected stream the child duplicates the child end of the pipe
 * onto 0, 1 or 2 and then closes both original pipe descriptors. Leaving the
 * parent's write end of the stdin pipe open inside the child would keep that
 * pipe writable forever, so the child would never see end-of-file on input.
 */

use crate::core::{check_code, Descriptor, SyscallResult};
use crate::io::Pipe;
use serde::{Deserialize, Serialize};
use std::mem::MaybeUninit;

/// One instruction executed inside the child before the program starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum FileAction {
    Dup2 { from: Descriptor, to: Descriptor },
    Close { fd: Descriptor },
}

/// Ordered list of child-side descriptor actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPlan {
    actions: Vec<FileAction>,
}

impl SpawnPlan {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan for the three standard-stream pipes
    #[must_use]
    pub fn for_pipes(stdin: &Pipe, stdout: &Pipe, stderr: &Pipe) -> Self {
        let mut plan = Self::new();
        plan.redirect(stdin.read_end, Descriptor::STDIN, stdin.write_end)
            .redirect(stdout.write_end, Descriptor::STDOUT, stdout.read_end)
            .redirect(stderr.write_end, Descriptor::STDERR, stderr.read_end);
        plan
    }

    /// Make `child_end` the child's `target`, then close both pipe ends in the child
    ///
    /// Descriptors that are themselves standard streams are never closed.
    pub fn redirect(
        &mut self,
        child_end: Descriptor,
        target: Descriptor,
        parent_end: Descriptor,
    ) -> &mut Self {
        self.actions.push(FileAction::Dup2 {
            from: child_end,
            to: target,
        });
        for fd in [child_end, parent_end] {
            if fd.is_valid() && !fd.is_standard() {
                self.actions.push(FileAction::Close { fd });
            }
        }
        self
    }

    #[inline]
    pub fn actions(&self) -> &[FileAction] {
        &self.actions
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Build the kernel-side file actions object
    pub(crate) fn render(&self) -> SyscallResult<FileActions> {
        let mut file_actions = FileActions::new()?;
        for action in &self.actions {
            match *action {
                FileAction::Dup2 { from, to } => file_actions.add_dup2(from, to)?,
                FileAction::Close { fd } => file_actions.add_close(fd)?,
            }
        }
        Ok(file_actions)
    }
}

/// Owned `posix_spawn_file_actions_t`, destroyed on drop
pub(crate) struct FileActions {
    inner: Box<MaybeUninit<libc::posix_spawn_file_actions_t>>,
}

impl FileActions {
    fn new() -> SyscallResult<Self> {
        let mut inner: Box<MaybeUninit<libc::posix_spawn_file_actions_t>> =
            Box::new(MaybeUninit::uninit());
        check_code("posix_spawn_file_actions_init", unsafe {
            libc::posix_spawn_file_actions_init(inner.as_mut_ptr())
        })?;
        Ok(Self { inner })
    }

    fn add_dup2(&mut self, from: Descriptor, to: Descriptor) -> SyscallResult<()> {
        check_code("posix_spawn_file_actions_adddup2", unsafe {
            libc::posix_spawn_file_actions_adddup2(self.inner.as_mut_ptr(), from.as_raw(), to.as_raw())
        })
    }

    fn add_close(&mut self, fd: Descriptor) -> SyscallResult<()> {
        check_code("posix_spawn_file_actions_addclose", unsafe {
            libc::posix_spawn_file_actions_addclose(self.inner.as_mut_ptr(), fd.as_raw())
        })
    }

    pub(crate) fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        self.inner.as_ptr()
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(self.inner.as_mut_ptr());
        }
    }
}
