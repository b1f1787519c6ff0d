/*!
 * Process Handle
 * Spawning, signaling, and reaping one child process with optional piped stdio
 *
 * Cleanup is asymmetric:
 * - spawn failure closes every pipe end that was created, nothing is returned
 * - spawn success closes the child-side ends in the parent before returning
 * - a successful wait closes the parent-side ends after the child is reaped
 * - dropping an unwaited handle closes the parent-side ends and leaves the
 *   child for someone else to reap
 */

use super::plan::SpawnPlan;
use super::types::{signal_name, Environment, ProcessState, SpawnConfig, WaitStatus};
use crate::core::{check, to_cstring, CStringArray, Descriptor, Pid, SyscallError, SyscallResult};
use crate::io::{close, create_pipe, Pipe};
use crate::monitoring::{span_blocking, span_syscall};
use nix::errno::Errno;
use nix::sys::signal::Signal;
use std::ffi::OsStr;
use std::path::Path;
use std::ptr;
use tracing::{debug, error, info, trace, warn};

/// A spawned child process and the parent's ends of its standard streams
///
/// The handle owns `stdin`, `stdout` and `stderr` until they are closed or
/// taken. It never reaps the child on its own: call
/// [`ProcessHandle::wait_until_exit`] or the child stays a zombie after it
/// exits.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    stdin: Option<Descriptor>,
    stdout: Option<Descriptor>,
    stderr: Option<Descriptor>,
    has_waited: bool,
}

impl ProcessHandle {
    /// Spawn `path` with the full argument vector `args`
    ///
    /// `args[0]` is passed through unchanged; it is not derived from `path`.
    /// `env` of `None` inherits the current environment; `Some` replaces it
    /// exactly. With `redirect`, the child's 0/1/2 are connected to pipes
    /// whose other ends are exposed through [`stdin`](Self::stdin),
    /// [`stdout`](Self::stdout) and [`stderr`](Self::stderr).
    pub fn spawn<S: AsRef<OsStr>>(
        path: impl AsRef<Path>,
        args: &[S],
        env: Option<&Environment>,
        redirect: bool,
    ) -> SyscallResult<Self> {
        let path = path.as_ref();
        debug!(
            path = %path.display(),
            argc = args.len(),
            inherit_env = env.is_none(),
            redirect,
            "spawning process"
        );

        let c_path = to_cstring("executable path", path.as_os_str())?;
        let argv = CStringArray::from_args(args)?;
        let envp = match env {
            Some(env) => CStringArray::from_pairs(env.iter())?,
            None => CStringArray::inherited()?,
        };

        let pipes = if redirect {
            Some(StdioPipes::create()?)
        } else {
            None
        };
        let plan = pipes.as_ref().map(StdioPipes::plan).unwrap_or_default();
        let file_actions = plan.render()?;

        let span = span_syscall("posix_spawn", 0);
        let mut pid: libc::pid_t = 0;
        let ret = unsafe {
            libc::posix_spawn(
                &mut pid,
                c_path.as_ptr(),
                file_actions.as_ptr(),
                ptr::null(),
                argv.as_ptr() as *const *mut libc::c_char,
                envp.as_ptr() as *const *mut libc::c_char,
            )
        };
        if ret != 0 {
            let err = SyscallError::from_code("posix_spawn", ret);
            span.record_error(&err.to_string());
            error!(path = %path.display(), error = %err, "spawn failed");
            // `pipes` drops here and closes every end it still holds.
            return Err(err);
        }

        span.record_pid(pid);
        span.record_result(true);
        drop(span);

        let (stdin, stdout, stderr) = match pipes {
            Some(pipes) => {
                let (stdin, stdout, stderr) = pipes.into_parent_ends();
                (Some(stdin), Some(stdout), Some(stderr))
            }
            None => (None, None, None),
        };

        info!(pid, path = %path.display(), redirect, "spawned child process");
        Ok(Self {
            pid,
            stdin,
            stdout,
            stderr,
            has_waited: false,
        })
    }

    /// Spawn from a [`SpawnConfig`]
    pub fn spawn_with(config: &SpawnConfig) -> SyscallResult<Self> {
        Self::spawn(
            &config.path,
            &config.os_args(),
            config.env.as_ref(),
            config.redirect,
        )
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Parent's write end of the child's standard input
    #[inline]
    pub fn stdin(&self) -> Option<Descriptor> {
        self.stdin
    }

    /// Parent's read end of the child's standard output
    #[inline]
    pub fn stdout(&self) -> Option<Descriptor> {
        self.stdout
    }

    /// Parent's read end of the child's standard error
    #[inline]
    pub fn stderr(&self) -> Option<Descriptor> {
        self.stderr
    }

    #[inline]
    pub fn has_waited(&self) -> bool {
        self.has_waited
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        if self.has_waited {
            ProcessState::Waited
        } else {
            ProcessState::Running
        }
    }

    /// Detach the stdin descriptor; the caller becomes responsible for closing it
    pub fn take_stdin(&mut self) -> Option<Descriptor> {
        self.stdin.take()
    }

    /// Detach the stdout descriptor; the caller becomes responsible for closing it
    pub fn take_stdout(&mut self) -> Option<Descriptor> {
        self.stdout.take()
    }

    /// Detach the stderr descriptor; the caller becomes responsible for closing it
    pub fn take_stderr(&mut self) -> Option<Descriptor> {
        self.stderr.take()
    }

    /// Close the child's input so it observes end-of-file
    pub fn close_stdin(&mut self) -> SyscallResult<()> {
        close_slot(&mut self.stdin)
    }

    pub fn close_stdout(&mut self) -> SyscallResult<()> {
        close_slot(&mut self.stdout)
    }

    pub fn close_stderr(&mut self) -> SyscallResult<()> {
        close_slot(&mut self.stderr)
    }

    /// Close every stream still held. All are attempted; the first failure is returned.
    pub fn close_streams(&mut self) -> SyscallResult<()> {
        let stdin = self.close_stdin();
        let stdout = self.close_stdout();
        let stderr = self.close_stderr();
        stdin.and(stdout).and(stderr)
    }

    /// Send signal number `signal` to the child
    ///
    /// Exactly one `kill(2)` call; the kernel decides whether the number is
    /// valid. Signal 0 only checks that the child still exists. Fails without
    /// a syscall once the child has been reaped, since its pid may already
    /// belong to another process.
    pub fn send_signal(&self, signal: i32) -> SyscallResult<()> {
        if self.has_waited {
            return Err(SyscallError::AlreadyWaited { pid: self.pid });
        }

        check("kill", unsafe { libc::kill(self.pid, signal) }).map_err(|e| {
            warn!(pid = self.pid, signal, name = signal_name(signal), error = %e, "failed to signal child");
            e
        })?;

        debug!(pid = self.pid, signal, name = signal_name(signal), "sent signal");
        Ok(())
    }

    /// Ask the child to exit (`SIGTERM`)
    #[inline]
    pub fn terminate(&self) -> SyscallResult<()> {
        self.send_signal(Signal::SIGTERM as i32)
    }

    /// Force the child to exit (`SIGKILL`)
    #[inline]
    pub fn kill(&self) -> SyscallResult<()> {
        self.send_signal(Signal::SIGKILL as i32)
    }

    /// Block until the child changes state, reap it, then close the streams
    ///
    /// Interrupted waits are retried. A second call fails with
    /// [`SyscallError::AlreadyWaited`] and makes no syscall.
    pub fn wait_until_exit(&mut self) -> SyscallResult<WaitStatus> {
        if self.has_waited {
            return Err(SyscallError::AlreadyWaited { pid: self.pid });
        }

        let span = span_blocking("waitpid", self.pid);
        let mut raw_status: libc::c_int = 0;
        loop {
            match Errno::result(unsafe { libc::waitpid(self.pid, &mut raw_status, 0) }) {
                Ok(_) => break,
                Err(Errno::EINTR) => {
                    trace!(pid = self.pid, "waitpid interrupted, retrying");
                }
                Err(errno) => {
                    span.record_error(errno.desc());
                    error!(pid = self.pid, error = %errno, "waitpid failed");
                    return Err(SyscallError::system("waitpid", errno));
                }
            }
        }

        span.record_result(true);
        drop(span);

        self.has_waited = true;
        let status = WaitStatus::from_raw(raw_status);
        info!(pid = self.pid, %status, "child process reaped");

        // The child is gone, so a failed close cannot affect it; keep the status.
        if let Err(e) = self.close_streams() {
            warn!(pid = self.pid, error = %e, "failed to close streams after wait");
        }

        Ok(status)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close_streams() {
            warn!(pid = self.pid, error = %e, "failed to close streams during teardown");
        }
        if !self.has_waited {
            warn!(
                pid = self.pid,
                "process handle dropped without waiting; the child may remain a zombie until reaped"
            );
        }
    }
}

fn close_slot(slot: &mut Option<Descriptor>) -> SyscallResult<()> {
    match slot.take() {
        Some(fd) => close(fd),
        None => Ok(()),
    }
}

/// The three pipes of a redirected spawn
///
/// While armed, every end is closed on drop. That is the rollback path for
/// any failure between pipe creation and a successful spawn.
struct StdioPipes {
    stdin: Pipe,
    stdout: Pipe,
    stderr: Pipe,
    armed: bool,
}

impl StdioPipes {
    fn create() -> SyscallResult<Self> {
        let mut created: Vec<Pipe> = Vec::with_capacity(3);
        for _ in 0..3 {
            match create_pipe() {
                Ok(pipe) => created.push(pipe),
                Err(e) => {
                    close_pipes(&created);
                    return Err(e);
                }
            }
        }
        Ok(Self {
            stdin: created[0],
            stdout: created[1],
            stderr: created[2],
            armed: true,
        })
    }

    fn plan(&self) -> SpawnPlan {
        SpawnPlan::for_pipes(&self.stdin, &self.stdout, &self.stderr)
    }

    /// Close the child-side ends in the parent and hand back the parent-side
    /// ends as (stdin write end, stdout read end, stderr read end)
    fn into_parent_ends(mut self) -> (Descriptor, Descriptor, Descriptor) {
        self.armed = false;

        // The child already holds duplicates of these. Keeping them open here
        // would stop the parent's read ends from ever reaching end-of-file.
        for child_end in [self.stdin.read_end, self.stdout.write_end, self.stderr.write_end] {
            if let Err(e) = close(child_end) {
                warn!(fd = %child_end, error = %e, "failed to close child-side pipe end");
            }
        }

        (self.stdin.write_end, self.stdout.read_end, self.stderr.read_end)
    }
}

impl Drop for StdioPipes {
    fn drop(&mut self) {
        if self.armed {
            close_pipes(&[self.stdin, self.stdout, self.stderr]);
        }
    }
}

fn close_pipes(pipes: &[Pipe]) {
    for pipe in pipes {
        if let Err(e) = pipe.close() {
            warn!(error = %e, "failed to close pipe during spawn rollback");
        }
    }
}
