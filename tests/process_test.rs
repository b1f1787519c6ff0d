/*!
 * Process Tests
 * Spawning children with and without piped stdio, environments, and waiting
 */

use nix::errno::Errno;
use pretty_assertions::assert_eq;
use procpipe::{
    close, read_to_string, write_str, Environment, ProcessHandle, ProcessState, SpawnConfig,
    SyscallError, WaitOutcome,
};
use serial_test::serial;

fn sh(script: &str, redirect: bool) -> ProcessHandle {
    ProcessHandle::spawn("/bin/sh", &["sh", "-c", script], None, redirect).unwrap()
}

#[test]
fn test_cat_echoes_stdin() {
    let mut child = ProcessHandle::spawn("/bin/cat", &["cat"], None, true).unwrap();

    write_str(child.stdin().unwrap(), "hello through cat\n").unwrap();
    child.close_stdin().unwrap();
    assert_eq!(child.stdin(), None);

    let out = read_to_string(child.stdout().unwrap()).unwrap();
    assert_eq!(out, "hello through cat\n");

    let status = child.wait_until_exit().unwrap();
    assert_eq!(status.exit_code(), Some(0));
    assert!(status.success());
}

#[test]
fn test_exit_code_with_redirect() {
    let mut child = sh("exit 7", true);
    let status = child.wait_until_exit().unwrap();

    assert_eq!(status.exit_code(), Some(7));
    assert_eq!(status.terminating_signal(), None);
    assert_eq!(status.stopping_signal(), None);
    assert_eq!(status.outcome(), WaitOutcome::Exited(7));
}

#[test]
fn test_exit_code_without_redirect() {
    let mut child = sh("exit 7", false);
    assert_eq!(child.stdin(), None);
    assert_eq!(child.stdout(), None);
    assert_eq!(child.stderr(), None);

    let status = child.wait_until_exit().unwrap();
    assert_eq!(status.exit_code(), Some(7));
    assert_eq!(status.terminating_signal(), None);
}

#[test]
fn test_stdout_and_stderr_are_separate() {
    let mut child = sh("echo out; echo err >&2", true);

    let out = read_to_string(child.stdout().unwrap()).unwrap();
    let err = read_to_string(child.stderr().unwrap()).unwrap();
    assert_eq!(out, "out\n");
    assert_eq!(err, "err\n");

    assert!(child.wait_until_exit().unwrap().success());
}

#[test]
fn test_argv_zero_is_passed_through() {
    let mut child =
        ProcessHandle::spawn("/bin/sh", &["custom-name", "-c", "echo $0"], None, true).unwrap();
    let out = read_to_string(child.stdout().unwrap()).unwrap();
    assert_eq!(out, "custom-name\n");
    child.wait_until_exit().unwrap();
}

#[test]
fn test_child_sees_eof_once_stdin_closed() {
    // `wc -c` only prints after end-of-file on its input.
    let mut child = sh("wc -c", true);
    write_str(child.stdin().unwrap(), "12345").unwrap();
    child.close_stdin().unwrap();

    let out = read_to_string(child.stdout().unwrap()).unwrap();
    assert_eq!(out.trim(), "5");
    assert!(child.wait_until_exit().unwrap().success());
}

#[test]
fn test_taken_stdin_belongs_to_caller() {
    let mut child = ProcessHandle::spawn("/bin/cat", &["cat"], None, true).unwrap();
    let input = child.take_stdin().unwrap();
    assert_eq!(child.stdin(), None);

    write_str(input, "taken").unwrap();
    close(input).unwrap();

    assert_eq!(read_to_string(child.stdout().unwrap()).unwrap(), "taken");
    child.wait_until_exit().unwrap();
}

#[test]
fn test_empty_environment() {
    let env = Environment::new();
    let mut child = ProcessHandle::spawn("/usr/bin/env", &["env"], Some(&env), true).unwrap();

    let out = read_to_string(child.stdout().unwrap()).unwrap();
    assert_eq!(out, "");
    assert!(child.wait_until_exit().unwrap().success());
}

#[test]
fn test_explicit_environment_is_exact() {
    let env = Environment::new().with("PROCPIPE_ONLY", "1");
    let mut child = ProcessHandle::spawn("/usr/bin/env", &["env"], Some(&env), true).unwrap();

    let out = read_to_string(child.stdout().unwrap()).unwrap();
    assert_eq!(out, "PROCPIPE_ONLY=1\n");
    child.wait_until_exit().unwrap();
}

#[test]
#[serial]
fn test_absent_environment_is_inherited() {
    std::env::set_var("PROCPIPE_INHERITED_MARKER", "present");

    let mut child = ProcessHandle::spawn("/usr/bin/env", &["env"], None, true).unwrap();
    let out = read_to_string(child.stdout().unwrap()).unwrap();
    child.wait_until_exit().unwrap();

    std::env::remove_var("PROCPIPE_INHERITED_MARKER");
    assert!(out.lines().any(|line| line == "PROCPIPE_INHERITED_MARKER=present"));
}

#[test]
fn test_missing_executable_fails_spawn() {
    let err = ProcessHandle::spawn("/nonexistent/procpipe-missing", &["missing"], None, true)
        .unwrap_err();

    assert_eq!(err.operation(), Some("posix_spawn"));
    assert!(err.is_errno(Errno::ENOENT));
}

#[test]
fn test_nul_in_argument_is_encoding_error() {
    let err = ProcessHandle::spawn("/bin/echo", &["echo", "a\0b"], None, false).unwrap_err();
    assert!(matches!(err, SyscallError::Encoding(_)));
}

#[test]
fn test_nul_in_environment_is_encoding_error() {
    let env = Environment::new().with("KEY", "va\0lue");
    let err = ProcessHandle::spawn("/usr/bin/env", &["env"], Some(&env), true).unwrap_err();
    assert!(matches!(err, SyscallError::Encoding(_)));
}

#[test]
fn test_double_wait_is_rejected() {
    let mut child = sh("exit 0", true);
    assert_eq!(child.state(), ProcessState::Running);

    child.wait_until_exit().unwrap();
    assert_eq!(child.state(), ProcessState::Waited);
    assert!(child.has_waited());

    let err = child.wait_until_exit().unwrap_err();
    assert_eq!(err, SyscallError::AlreadyWaited { pid: child.pid() });
}

#[test]
fn test_spawn_with_config() {
    let config = SpawnConfig::new("/bin/sh")
        .with_args(["sh", "-c", "printf \"$GREETING\""])
        .with_env(Environment::new().with("GREETING", "hi"))
        .with_redirect(true);

    let mut child = ProcessHandle::spawn_with(&config).unwrap();
    assert_eq!(read_to_string(child.stdout().unwrap()).unwrap(), "hi");
    assert!(child.wait_until_exit().unwrap().success());
}

#[test]
fn test_concurrent_children_are_independent() {
    let mut children: Vec<_> = (0..4).map(|i| sh(&format!("exit {}", i), true)).collect();

    let codes: Vec<_> = children
        .iter_mut()
        .map(|child| child.wait_until_exit().unwrap().exit_code())
        .collect();
    assert_eq!(codes, vec![Some(0), Some(1), Some(2), Some(3)]);
}
