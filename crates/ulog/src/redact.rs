//! Context redaction.
//!
//! Keys whose lowercased name contains a sensitive substring have their
//! value replaced by [`REDACTION_MARKER`]. A key named exactly `email` with a
//! string value is partially masked instead of removed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::LogContext;

/// Replacement value for sensitive fields.
pub const REDACTION_MARKER: &str = "***REDACTED***";

/// Context key that receives partial masking.
pub const EMAIL_KEY: &str = "email";

/// Substrings that mark a context key as sensitive.
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "token",
    "apikey",
    "api_key",
    "secret",
    "creditcard",
    "credit_card",
    "ssn",
    "bankaccount",
    "bank_account",
    "privatekey",
    "private_key",
    "accesstoken",
    "access_token",
    "refreshtoken",
    "refresh_token",
    "authorization",
];

/// Keeps the first two characters and the domain of an address.
static EMAIL_MASK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.{2}).*(@.*)").unwrap_or_else(|_| unreachable!()));

/// Applies key-pattern redaction and email masking to context maps.
#[derive(Debug, Clone)]
pub struct Redactor {
    enabled: bool,
    /// Lowercased patterns
    patterns: Vec<String>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_PATTERNS.iter().copied())
    }
}

impl Redactor {
    /// Creates an enabled redactor with the given sensitive substrings.
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled: true,
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Creates a redactor that returns every context unchanged.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            patterns: Vec::new(),
        }
    }

    /// Returns true if redaction is applied.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if the key contains a sensitive substring.
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        let lower = key.to_lowercase();
        self.patterns.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Returns a redacted copy of the context. The input is never mutated.
    #[must_use]
    pub fn redact(&self, context: &LogContext) -> LogContext {
        if !self.enabled {
            return context.clone();
        }

        context
            .iter()
            .map(|(key, value)| {
                let value = if self.is_sensitive(key) {
                    serde_json::Value::String(REDACTION_MARKER.to_string())
                } else if let (EMAIL_KEY, Some(email)) = (key.as_str(), value.as_str()) {
                    serde_json::Value::String(mask_email(email))
                } else {
                    value.clone()
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// Masks an email address as `ab***@domain`.
///
/// Values without an `@` preceded by at least two characters are returned
/// unchanged.
#[must_use]
pub fn mask_email(email: &str) -> String {
    EMAIL_MASK_REGEX.replace(email, "${1}***${2}").into_owned()
}
