//! User identity and stored provider credentials.
//!
//! A [`UserRecord`] pairs a [`Username`] with the [`AccessToken`] the
//! financial-data provider issued for it. Records are persisted as a JSON
//! array using `Username` / `AccessToken` field names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// Username
// ---------------------------------------------------------------------------

/// Case-sensitive user name, the key of the credential store.
///
/// # Examples
///
/// ```
/// use ledgerlink_models::Username;
///
/// let name = Username::parse("alice").unwrap();
/// assert_eq!(name.as_str(), "alice");
/// assert!(Username::parse("   ").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Create a username without validation.
    ///
    /// Used for values that were already validated, such as records read
    /// back from the snapshot file.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Validate a username received from a client.
    ///
    /// The value is kept verbatim (no trimming, no case folding) but must
    /// contain at least one non-whitespace character.
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        if name.trim().is_empty() {
            return Err(ModelError::InvalidUsername {
                value: name.to_string(),
                reason: "must not be blank".into(),
            });
        }
        Ok(Self(name.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// Long-lived provider credential.
///
/// The value is opaque and never inspected. `Debug` is redacted so tokens
/// cannot leak through structured logging.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Return the raw secret, for sending to the provider or the owning client.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

/// One entry of the credential store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    /// Owner of the credential.
    pub username: Username,
    /// Token issued by the provider for this user.
    pub access_token: AccessToken,
}

impl UserRecord {
    /// Build a record from its parts.
    pub fn new(username: Username, access_token: AccessToken) -> Self {
        Self {
            username,
            access_token,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
