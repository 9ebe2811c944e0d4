use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum length accepted for a session token.
pub const MAX_SESSION_TOKEN_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionTokenError {
    #[error("session token is empty")]
    Empty,
    #[error("session token is longer than {MAX_SESSION_TOKEN_LEN} characters")]
    TooLong,
    #[error("session token contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Opaque per-run token that tells respondents apart in shared storage.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Creates a token from ASCII alphanumerics.
    ///
    /// # Errors
    ///
    /// Returns `SessionTokenError` if the value is empty, too long, or contains
    /// anything other than ASCII letters and digits.
    pub fn new(value: impl Into<String>) -> Result<Self, SessionTokenError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SessionTokenError::Empty);
        }
        if value.len() > MAX_SESSION_TOKEN_LEN {
            return Err(SessionTokenError::TooLong);
        }
        if let Some(bad) = value.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(SessionTokenError::InvalidChar(bad));
        }
        Ok(Self(value))
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({})", self.0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}
