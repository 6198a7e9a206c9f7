//! Redacting wrapper for tokens and passwords.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Access tokens, refresh tokens, MFA temp tokens and passwords travel in this.
///
/// `Debug` and `Display` print `[REDACTED]`, so a secret dropped into a
/// `tracing` field by accident does not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw value, for headers, cookies and request bodies only.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// Wire formats need the real value.
impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let token = SecretString::new("eyJhbGciOi");
        assert_eq!(format!("{token:?}"), "SecretString([REDACTED])");
        assert_eq!(token.to_string(), "[REDACTED]");
    }

    #[test]
    fn json_carries_the_raw_value() {
        let token: SecretString = "abc".into();
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
        let back: SecretString = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back.expose_secret(), "abc");
    }
}
