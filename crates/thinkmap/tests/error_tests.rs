//! Tests for core error types

use thinkmap::core::EditorError;

#[test]
fn test_http_status_error() {
    let error = EditorError::http_status(500);
    let error_msg = format!("{}", error);
    assert!(error_msg.contains("HTTP error"));
    assert!(error_msg.contains("500"));
    assert!(!error.is_auth());
}

#[test]
fn test_auth_statuses_are_flagged() {
    assert!(EditorError::http_status(401).is_auth());
    assert!(EditorError::http_status(403).is_auth());
    assert!(!EditorError::http_status(404).is_auth());
}

#[test]
fn test_transport_error() {
    let error = EditorError::transport("connection refused", true);
    let error_msg = format!("{}", error);
    assert!(error_msg.contains("Transport error"));
    assert!(error_msg.contains("connection refused"));
    assert!(error.is_network());
    assert!(!error.is_cancelled());
}

#[test]
fn test_cancelled_error() {
    let error = EditorError::Cancelled;
    assert!(error.is_cancelled());
    assert!(!error.is_network());
    assert_eq!(error.to_string(), "Request cancelled");
}

#[test]
fn test_invalid_spec_error() {
    let error = EditorError::invalid_spec("concept_map", "dangling connection");
    let error_msg = format!("{}", error);
    assert!(error_msg.contains("Invalid concept_map spec"));
    assert!(error_msg.contains("dangling connection"));
}

#[test]
fn test_rejected_and_config_errors() {
    assert!(EditorError::rejected("No active diagram")
        .to_string()
        .contains("Operation rejected"));
    assert!(EditorError::config("max_results must be positive")
        .to_string()
        .contains("Configuration error"));
}

#[test]
fn test_error_debug() {
    let error = EditorError::generation_failed("model overloaded");
    let debug_str = format!("{:?}", error);
    assert!(debug_str.contains("GenerationFailed"));
}

#[test]
fn test_errors_convert_into_anyhow() {
    fn fails() -> anyhow::Result<()> {
        Err(EditorError::malformed_response("no spec"))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.to_string().contains("Malformed response"));
}
