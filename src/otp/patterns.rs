//! Ordered regex cascade for pulling a numeric one-time code out of text.
//!
//! Earlier patterns are more specific and win over the generic digit-run
//! fallback. The fallback is known to be imprecise (order numbers, phone
//! fragments) and is tagged low-confidence so consumers can ignore it.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::RelayError;

/// How trustworthy a match is, based on which pattern produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Matched next to an explicit "OTP" / "verification code" marker.
    Labeled,
    /// Bare 4–8 digit run with no marker. May be a false positive.
    Generic,
}

#[derive(Clone)]
pub struct OtpPattern {
    regex: Regex,
    confidence: Confidence,
}

impl OtpPattern {
    /// Build a pattern. The regex must capture the code in group 1.
    pub fn new(pattern: &str, confidence: Confidence) -> Result<Self, RelayError> {
        let regex = Regex::new(pattern)
            .map_err(|e| RelayError::BadRequest(format!("invalid OTP pattern: {e}")))?;
        Ok(Self { regex, confidence })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpMatch {
    pub code: String,
    pub confidence: Confidence,
}

static DEFAULT_PATTERNS: LazyLock<Vec<OtpPattern>> = LazyLock::new(|| {
    vec![
        OtpPattern {
            regex: Regex::new(r"(?i)OTP[^0-9]*?(\d{4,8})").unwrap(),
            confidence: Confidence::Labeled,
        },
        OtpPattern {
            regex: Regex::new(r"(?i)verification code[^0-9]*?(\d{4,8})").unwrap(),
            confidence: Confidence::Labeled,
        },
        OtpPattern {
            regex: Regex::new(r"\b(\d{4,8})\b").unwrap(),
            confidence: Confidence::Generic,
        },
    ]
});

/// An ordered list of patterns, tried first to last.
pub struct PatternSet {
    patterns: Vec<OtpPattern>,
}

impl PatternSet {
    pub fn new(patterns: Vec<OtpPattern>) -> Self {
        Self { patterns }
    }

    /// Return the first match in pattern order, or None. A miss is the
    /// normal outcome while no OTP mail has arrived and never an error.
    pub fn find(&self, text: &str) -> Option<OtpMatch> {
        if text.is_empty() {
            return None;
        }

        for pattern in &self.patterns {
            if let Some(caps) = pattern.regex.captures(text) {
                if let Some(code) = caps.get(1) {
                    return Some(OtpMatch {
                        code: code.as_str().to_string(),
                        confidence: pattern.confidence,
                    });
                }
            }
        }

        None
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.clone())
    }
}
