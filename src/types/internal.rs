//! Internal data structures
//!
//! Defines the credential types passed between the token bootstrap and the
//! authenticated client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Number of leading characters shown by [`BearerToken::preview`]
const PREVIEW_LEN: usize = 15;

/// An opaque bearer credential, stored without the `Bearer ` prefix
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Create a token from a raw header value or bare credential.
    ///
    /// A leading `Bearer ` scheme is stripped and surrounding whitespace
    /// trimmed. Returns `None` if nothing is left.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let raw = raw.as_ref().trim();
        let value = match raw.get(..6) {
            Some(scheme)
                if scheme.eq_ignore_ascii_case("bearer")
                    && raw[6..].chars().next().is_none_or(char::is_whitespace) =>
            {
                raw[6..].trim()
            }
            _ => raw,
        };

        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    /// The credential value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value for this token
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Short prefix safe to log
    pub fn preview(&self) -> String {
        let prefix: String = self.0.chars().take(PREVIEW_LEN).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BearerToken").field(&self.preview()).finish()
    }
}

/// Summary of a captured token, printed by the `token` command
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReport {
    pub token_preview: String,
    pub token_length: usize,
    pub captured_at: DateTime<Utc>,
}

impl TokenReport {
    pub fn new(token: &BearerToken) -> Self {
        Self {
            token_preview: token.preview(),
            token_length: token.as_str().len(),
            captured_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc.def", "abc.def")]
    #[case("bearer abc.def", "abc.def")]
    #[case("  Bearer   abc.def  ", "abc.def")]
    #[case("abc.def", "abc.def")]
    fn test_bearer_prefix_stripped(#[case] raw: &str, #[case] expected: &str) {
        let token = BearerToken::new(raw).unwrap();
        assert_eq!(token.as_str(), expected);
        assert!(!token.as_str().starts_with("Bearer "));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("Bearer ")]
    #[case("Bearer    ")]
    fn test_empty_token_rejected(#[case] raw: &str) {
        assert!(BearerToken::new(raw).is_none());
    }

    #[test]
    fn test_header_value() {
        let token = BearerToken::new("xyz").unwrap();
        assert_eq!(token.header_value(), "Bearer xyz");
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = BearerToken::new("eyJhbGciOiJIUzI1NiJ9.secret-payload").unwrap();
        let debug = format!("{:?}", token);
        assert!(debug.contains("eyJhbGciOiJIUzI"));
        assert!(!debug.contains("secret-payload"));
    }

    #[test]
    fn test_token_report() {
        let token = BearerToken::new("Bearer 0123456789abcdefghij").unwrap();
        let report = TokenReport::new(&token);
        assert_eq!(report.token_preview, "0123456789abcde...");
        assert_eq!(report.token_length, 20);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("tokenPreview").is_some());
        assert!(json.get("capturedAt").is_some());
    }
}
