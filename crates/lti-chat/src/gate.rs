//! Admission check applied before any request is sent.

use lti_common::Rejection;

use crate::session::SessionState;

/// Decide whether `text` may be sent now. Returns the trimmed text.
///
/// Pure: the session is never touched, whatever the outcome.
pub fn admit<'a>(
    ready: bool,
    session: &SessionState,
    text: &'a str,
) -> Result<&'a str, Rejection> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Rejection::EmptyRequest);
    }
    if !ready {
        return Err(Rejection::NotReady);
    }
    if session.is_limit_reached() {
        return Err(Rejection::QuotaReached);
    }
    if session.has_open_exchange() {
        return Err(Rejection::ExchangeOpen);
    }
    Ok(text)
}
