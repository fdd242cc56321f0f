//! Tests for `src/logging.rs`.

use anthrokit::logging::LoggingGuard;

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_study_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs").join("study");
    assert!(!logs_dir.exists());

    // Only one global subscriber can be installed per process, so the
    // result is ignored; the directory is created either way.
    let _result = anthrokit::logging::init_study(&logs_dir, "info");
    assert!(logs_dir.exists(), "logs directory should be created");
}

#[test]
fn init_cli_is_idempotent() {
    anthrokit::logging::init_cli("warn");
    anthrokit::logging::init_cli("debug");
}
