use super::*;

#[test]
fn status_codes_map_to_retryable() {
    let throttled = BackendError::Status { status: 429, body: String::new() };
    let server = BackendError::Status { status: 503, body: String::new() };
    let missing = BackendError::Status { status: 404, body: String::new() };
    assert!(throttled.retryable());
    assert!(server.retryable());
    assert!(!missing.retryable());
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(BackendError::Unauthenticated.error_code(), "E_UNAUTHENTICATED");
    assert_eq!(BackendError::Decode("x".into()).error_code(), "E_DECODE");
    assert_eq!(BackendError::Realtime("x".into()).error_code(), "E_REALTIME");
}

#[test]
fn json_errors_become_decode_errors() {
    let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(BackendError::from(err), BackendError::Decode(_)));
}
