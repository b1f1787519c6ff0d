/*!
 * procpipe - run one command through the library
 *
 * Usage: procpipe <path> [args...]
 *
 * The child gets `argv = [path, args...]`, the inherited environment, and
 * piped stdio. Our stdin is forwarded to it, its stdout and stderr are
 * relayed to ours, and we exit with its exit code (128 + signal if it was
 * killed by a signal).
 */

use miette::{miette, Result};
use procpipe::io::READ_CHUNK;
use procpipe::{
    close, init_tracing, read, write_all, Descriptor, ProcessHandle, ReadOutcome, RuntimeConfig,
    SyscallResult, WaitOutcome, WaitStatus,
};
use serde_json::json;
use std::ffi::OsString;
use std::thread;
use tracing::{debug, warn};

fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    init_tracing(&config);

    let mut args = std::env::args_os().skip(1);
    let path = args
        .next()
        .ok_or_else(|| miette!("usage: procpipe <path> [args...]"))?;
    let argv: Vec<OsString> = std::iter::once(path.clone()).chain(args).collect();

    let mut child = ProcessHandle::spawn(&path, &argv, None, true)?;

    // Blocks on our stdin for as long as it stays open, so it is never joined.
    if let Some(input) = child.take_stdin() {
        thread::spawn(move || forward_stdin(input));
    }

    let stdout = child.stdout();
    let stderr = child.stderr();
    thread::scope(|scope| -> Result<()> {
        let errors = stderr.map(|fd| scope.spawn(move || relay(fd, Descriptor::STDERR)));
        if let Some(fd) = stdout {
            relay(fd, Descriptor::STDOUT)?;
        }
        if let Some(handle) = errors {
            handle
                .join()
                .map_err(|_| miette!("stderr relay thread panicked"))??;
        }
        Ok(())
    })?;

    let status = child.wait_until_exit()?;
    if config.status_json {
        report_status(child.pid(), status);
    }
    drop(child);

    std::process::exit(exit_code(status));
}

/// Copy our stdin into the child until either side is done
fn forward_stdin(input: Descriptor) {
    let result = (|| -> SyscallResult<()> {
        loop {
            match read(Descriptor::STDIN, READ_CHUNK)? {
                ReadOutcome::Data(bytes) => write_all(input, &bytes)?,
                ReadOutcome::EndOfFile => return Ok(()),
                ReadOutcome::WouldBlock => continue,
            }
        }
    })();

    match result {
        Ok(()) => debug!("stdin forwarded"),
        // The child stopped reading; not an error for us.
        Err(e) if e.is_errno(nix::errno::Errno::EPIPE) => debug!("child closed its stdin"),
        Err(e) => warn!(error = %e, "failed to forward stdin"),
    }
    if let Err(e) = close(input) {
        warn!(error = %e, "failed to close child stdin");
    }
}

/// Copy `from` to `to` until end-of-file, returning the byte count
fn relay(from: Descriptor, to: Descriptor) -> SyscallResult<u64> {
    let mut total = 0u64;
    loop {
        match read(from, READ_CHUNK)? {
            ReadOutcome::Data(bytes) => {
                write_all(to, &bytes)?;
                total += bytes.len() as u64;
            }
            ReadOutcome::EndOfFile => break,
            ReadOutcome::WouldBlock => continue,
        }
    }
    debug!(from = %from, to = %to, bytes = total, "relay finished");
    Ok(total)
}

fn report_status(pid: procpipe::Pid, status: WaitStatus) {
    let report = json!({
        "pid": pid,
        "status": status.outcome(),
        "raw": status.raw(),
        "description": status.to_string(),
    });
    eprintln!("{}", report);
}

fn exit_code(status: WaitStatus) -> i32 {
    match status.outcome() {
        WaitOutcome::Exited(code) => code,
        WaitOutcome::Signaled(signal) | WaitOutcome::Stopped(signal) => 128 + signal,
        WaitOutcome::Unknown(_) => 1,
    }
}
