//! Attack log store tests
//!
//! Run with: cargo test --test logger_test

use honeypot::logger::AttackLogger;
use honeypot::types::{AttackRecord, Protocol};
use std::fs;
use std::path::PathBuf;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("honeypot_test_logger_{}", tag));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn record(n: usize) -> AttackRecord {
    AttackRecord::new("203.0.113.50", 80, Protocol::Http)
        .with_username(&format!("user{}", n))
        .with_password("hunter2")
        .with_user_agent("curl/7.81")
        .with_payload_hash("d41d8cd98f00b204e9800998ecf8427e".to_string())
        .with_metadata(&format!("Method: POST, Path: /login{}", n))
}

// =============================================================================
// RING SEMANTICS
// =============================================================================

#[test]
fn test_count_never_exceeds_capacity() {
    let dir = temp_dir("cap");
    let mut logger = AttackLogger::open(&dir).unwrap();

    for n in 0..250 {
        logger.log(record(n));
        assert!(logger.count() <= 100);
    }
    assert_eq!(logger.count(), 100);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_recent_with_excess_n_returns_exactly_count() {
    let dir = temp_dir("excess");
    let mut logger = AttackLogger::open(&dir).unwrap();

    for n in 0..7 {
        logger.log(record(n));
    }
    for k in [0usize, 1, 50, 1000] {
        assert_eq!(logger.recent(100 + k).len(), 7);
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_recent_order_after_overwrite() {
    let dir = temp_dir("overwrite");
    let mut logger = AttackLogger::open(&dir).unwrap();

    // Rotate well past capacity.
    for n in 0..120 {
        logger.log(record(n));
    }

    let recent = logger.recent(3);
    assert_eq!(recent[0].username, "user119");
    assert_eq!(recent[1].username, "user118");
    assert_eq!(recent[2].username, "user117");

    // Oldest surviving record is the 100th-from-last.
    let all = logger.recent(usize::MAX);
    assert_eq!(all.len(), 100);
    assert_eq!(all[99].username, "user20");

    let _ = fs::remove_dir_all(&dir);
}

// =============================================================================
// CLEAR SEMANTICS
// =============================================================================

#[test]
fn test_clear_twice_equals_clear_once() {
    let dir = temp_dir("clear2");
    let mut logger = AttackLogger::open(&dir).unwrap();
    for n in 0..5 {
        logger.log(record(n));
    }

    logger.clear().unwrap();
    let once = (logger.count(), logger.recent(10).len(), logger.stats());
    logger.clear().unwrap();
    let twice = (logger.count(), logger.recent(10).len(), logger.stats());
    assert_eq!(once, twice);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_logging_resumes_after_clear() {
    let dir = temp_dir("resume");
    let mut logger = AttackLogger::open(&dir).unwrap();
    logger.log(record(1));
    logger.clear().unwrap();

    logger.log(record(2));
    assert_eq!(logger.count(), 1);
    assert_eq!(logger.recent(10)[0].username, "user2");

    let _ = fs::remove_dir_all(&dir);
}

// =============================================================================
// DURABILITY
// =============================================================================

#[test]
fn test_records_survive_reopen() {
    let dir = temp_dir("reopen");
    {
        let mut logger = AttackLogger::open(&dir).unwrap();
        for n in 0..12 {
            logger.log(record(n));
        }
    }

    let logger = AttackLogger::open(&dir).unwrap();
    assert_eq!(logger.count(), 12);
    let recent = logger.recent(3);
    assert_eq!(recent[0].username, "user11");
    assert_eq!(recent[2].username, "user9");

    let _ = fs::remove_dir_all(&dir);
}

// =============================================================================
// JSON FORMAT
// =============================================================================

#[test]
fn test_json_round_trip() {
    let original = record(42);
    let json = original.to_json().unwrap();
    let parsed: AttackRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, original);
}

#[test]
fn test_json_round_trip_with_truncation() {
    let oversized = AttackRecord::new("203.0.113.51", 23, Protocol::Telnet)
        .with_username(&"u".repeat(500))
        .with_password(&"p".repeat(500))
        .with_metadata(&"m".repeat(500));
    let json = oversized.to_json().unwrap();
    let parsed: AttackRecord = serde_json::from_str(&json).unwrap();

    // Round-trip is exact modulo the caps already applied on build.
    assert_eq!(parsed, oversized);
    assert_eq!(parsed.username.len(), 64);
    assert_eq!(parsed.password.len(), 64);
    assert_eq!(parsed.metadata.len(), 255);
}

#[test]
fn test_json_shape() {
    let mut rec = record(1);
    rec.timestamp = 1_600_000_000;
    let json = rec.to_json().unwrap();
    assert!(json.contains("\"timestamp\":\"2020-09-13T12:26:40Z\""));
    assert!(json.contains("\"service\":\"HTTP\""));
    assert!(json.contains("\"target_port\":80"));
    assert!(!json.contains('\n'));
}
