/*!
 * Descriptor Tests
 * Opening, reading, writing, and closing files through raw descriptors
 */

use nix::errno::Errno;
use pretty_assertions::assert_eq;
use procpipe::{
    close, open, read, read_to_string, write, write_all, write_str, Descriptor, OpenFlags,
    Permissions, ReadOutcome, SyscallError,
};
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

#[test]
fn test_create_write_then_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.txt");

    let fd = open(&path, OpenFlags::create(), None).unwrap();
    assert!(fd.is_valid());
    write_all(fd, b"hello ").unwrap();
    write_str(fd, "world").unwrap();
    close(fd).unwrap();

    let fd = open(&path, OpenFlags::read_only(), None).unwrap();
    assert_eq!(read_to_string(fd).unwrap(), "hello world");
    close(fd).unwrap();
}

#[test]
fn test_read_in_chunks_until_eof() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chunks.bin");
    std::fs::write(&path, b"abcdefg").unwrap();

    let fd = open(&path, OpenFlags::read_only(), None).unwrap();
    assert_eq!(read(fd, 3).unwrap(), ReadOutcome::Data(b"abc".to_vec()));
    assert_eq!(read(fd, 3).unwrap(), ReadOutcome::Data(b"def".to_vec()));
    assert_eq!(read(fd, 3).unwrap(), ReadOutcome::Data(b"g".to_vec()));
    assert_eq!(read(fd, 3).unwrap(), ReadOutcome::EndOfFile);
    close(fd).unwrap();
}

#[test]
fn test_append_keeps_existing_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    std::fs::write(&path, "one\n").unwrap();

    let fd = open(&path, OpenFlags::append_only(), None).unwrap();
    write_str(fd, "two\n").unwrap();
    close(fd).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_open_missing_file_is_enoent() {
    let dir = TempDir::new().unwrap();
    let err = open(dir.path().join("missing"), OpenFlags::read_only(), None).unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.operation(), Some("open"));
    assert_eq!(err.code(), Some(Errno::ENOENT as i32));
}

#[test]
fn test_create_new_refuses_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exists");
    std::fs::write(&path, "x").unwrap();

    let err = open(&path, OpenFlags::create_new(), None).unwrap_err();
    assert!(err.is_errno(Errno::EEXIST));
}

#[test]
fn test_create_uses_requested_permissions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("secret");

    let fd = open(&path, OpenFlags::create_new(), Some(Permissions::private())).unwrap();
    close(fd).unwrap();

    // Requested 0o600 is never widened by the umask.
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn test_invalid_flags_rejected_before_kernel() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("never-created");
    let flags = OpenFlags {
        read: true,
        create_new: true,
        ..Default::default()
    };

    let err = open(&path, flags, None).unwrap_err();
    assert!(matches!(err, SyscallError::InvalidArgument(_)));
    assert!(!path.exists());
}

#[test]
fn test_path_with_nul_is_encoding_error() {
    let err = open("bad\0path", OpenFlags::read_only(), None).unwrap_err();
    assert!(matches!(err, SyscallError::Encoding(_)));
}

#[test]
fn test_zero_length_operations_skip_the_kernel() {
    // The invalid sentinel would fail with EBADF if a syscall were made.
    assert_eq!(read(Descriptor::INVALID, 0).unwrap(), ReadOutcome::Data(Vec::new()));
    assert_eq!(write(Descriptor::INVALID, &[]).unwrap(), 0);
    close(Descriptor::INVALID).unwrap();
}

#[test]
fn test_write_to_read_only_descriptor_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ro");
    std::fs::write(&path, "x").unwrap();

    let fd = open(&path, OpenFlags::read_only(), None).unwrap();
    let err = write(fd, b"y").unwrap_err();
    assert!(err.is_errno(Errno::EBADF));
    assert_eq!(err.operation(), Some("write"));
    close(fd).unwrap();
}

#[test]
fn test_invalid_utf8_is_encoding_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("binary");
    std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

    let fd = open(&path, OpenFlags::read_only(), None).unwrap();
    let err = read_to_string(fd).unwrap_err();
    assert!(matches!(err, SyscallError::Encoding(_)));
    close(fd).unwrap();
}
