//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = LtiConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_quota_zero() {
    let mut config = LtiConfig::default();
    config.session.quota_max = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.quota_max"));
}

#[test]
fn catches_http_url() {
    let mut config = LtiConfig::default();
    config.connection.url = "http://localhost:8000/chat".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.url"));
}

#[test]
fn accepts_secure_url() {
    let mut config = LtiConfig::default();
    config.connection.url = "wss://fin-demo.xyz/ws".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_retry_delay_too_small() {
    let mut config = LtiConfig::default();
    config.connection.retry_delay_ms = 10;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.retry_delay_ms"));
}

#[test]
fn catches_too_many_retries() {
    let mut config = LtiConfig::default();
    config.connection.max_retries = 50;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.max_retries"));
}

#[test]
fn catches_blank_welcome_and_blank_example() {
    let mut config = LtiConfig::default();
    config.session.welcome_message = "   ".into();
    config.session.example_questions.push(String::new());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.welcome_message"));
    assert!(err.contains("session.example_questions"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = LtiConfig::default();
    config.session.quota_max = 5000;
    config.connection.connect_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.quota_max"));
    assert!(err.contains("connection.connect_timeout_secs"));
    assert!(err.contains("; "));
}

#[test]
fn duration_helpers_convert_units() {
    let config = LtiConfig::default();
    assert_eq!(config.connection.retry_delay().as_millis(), 2000);
    assert_eq!(config.connection.connect_timeout().as_secs(), 15);
}
