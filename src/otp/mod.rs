//! OTP pipeline: poll the mailbox, decode the newest match, extract a code.

pub mod extract;
pub mod patterns;

pub use extract::{decode_base64url, extract_plain_text};
pub use patterns::{Confidence, OtpMatch, OtpPattern, PatternSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::RelayError;
use crate::gmail::MailClient;

/// Outcome of one OTP poll. Derived, never persisted.
///
/// `otp` is None when the newest matching mail carried no recognizable code;
/// callers should treat that as "no OTP found yet", not a failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResult {
    pub otp: Option<String>,
    pub confidence: Option<Confidence>,
    pub received_at: DateTime<Utc>,
    pub raw_text: String,
}

/// Fetch the newest mail matching `query` and try to extract an OTP from it.
///
/// Returns `Ok(None)` when the query matches no messages at all — the
/// caller keeps polling. Credential and API failures propagate.
pub async fn latest(
    gmail: &MailClient,
    patterns: &PatternSet,
    query: &str,
    max_results: u32,
) -> Result<Option<OtpResult>, RelayError> {
    let refs = gmail.list_messages(query, max_results).await?;

    // The list endpoint returns newest first.
    let newest = match refs.first() {
        Some(r) => r,
        None => return Ok(None),
    };

    let msg = gmail.get_message(&newest.id).await?;

    let received_at = msg
        .internal_date
        .as_deref()
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    let raw_text = extract_plain_text(&msg);
    let found = patterns.find(&raw_text);

    Ok(Some(OtpResult {
        otp: found.as_ref().map(|m| m.code.clone()),
        confidence: found.map(|m| m.confidence),
        received_at,
        raw_text,
    }))
}
