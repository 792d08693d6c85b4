//! Tests for protocol errors

use super::*;

#[test]
fn test_truncated_display() {
    let err = ProtocolError::truncated("application_key", 16, 3);
    assert_eq!(
        err.to_string(),
        "truncated application_key: need 16 bytes, have 3"
    );
}

#[test]
fn test_too_large_display() {
    let err = ProtocolError::too_large("body", 2000, 1024);
    assert_eq!(err.to_string(), "body is 2000 bytes, limit is 1024");
    assert!(matches!(
        err,
        ProtocolError::PayloadTooLarge {
            field: "body",
            len: 2000,
            max: 1024
        }
    ));
}

#[test]
fn test_frame_too_large_display() {
    let err = ProtocolError::FrameTooLarge {
        size: 20_000_000,
        max: 16_777_216,
    };
    assert!(err.to_string().contains("20000000"));
    assert!(err.to_string().contains("16777216"));
}

#[test]
fn test_errors_compare_by_value() {
    assert_eq!(
        ProtocolError::UnknownCommand(9),
        ProtocolError::UnknownCommand(9)
    );
    assert_ne!(
        ProtocolError::UnknownCommand(9),
        ProtocolError::UnknownFilterState(9)
    );
}
