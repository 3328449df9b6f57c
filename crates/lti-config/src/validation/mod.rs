//! Configuration validation.
//!
//! Each section has its own check; all errors are collected into a
//! single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::LtiConfig;
use lti_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LtiConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_connection(&mut errors, config);
    validate_session(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_connection(errors: &mut Vec<String>, config: &LtiConfig) {
    let conn = &config.connection;
    if !(conn.url.starts_with("ws://") || conn.url.starts_with("wss://")) {
        errors.push(format!(
            "connection.url = {:?} must use the ws:// or wss:// scheme",
            conn.url
        ));
    }
    validate_range(errors, "connection.max_retries", conn.max_retries, 0, 20);
    validate_range(errors, "connection.retry_delay_ms", conn.retry_delay_ms, 100, 60_000);
    validate_range(
        errors,
        "connection.connect_timeout_secs",
        conn.connect_timeout_secs,
        1,
        120,
    );
}

fn validate_session(errors: &mut Vec<String>, config: &LtiConfig) {
    let session = &config.session;
    validate_range(errors, "session.quota_max", session.quota_max, 1, 1000);
    if session.welcome_message.trim().is_empty() {
        errors.push("session.welcome_message must not be empty".into());
    }
    if session
        .example_questions
        .iter()
        .any(|q| q.trim().is_empty())
    {
        errors.push("session.example_questions must not contain empty entries".into());
    }
}
