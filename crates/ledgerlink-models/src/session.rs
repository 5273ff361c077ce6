//! Request and response bodies of the sign-in flow.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::user::{AccessToken, Username};

/// Body of a successful `POST /signIn`.
///
/// Serialises as `{"accessToken": "…"}` for a known user and
/// `{"linkToken": "…"}` when the user must link a bank account first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SignInResponse {
    /// The user already has a stored credential.
    AccessToken(AccessToken),
    /// A new link session was opened for the user.
    LinkToken(String),
}

/// Body of `POST /getAccessToken`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    /// Public token returned by the link UI.
    pub public_token: String,
    /// User the resulting credential belongs to.
    pub username: String,
}

impl ExchangeRequest {
    /// Validate the request, returning the public token and username.
    pub fn validate(&self) -> Result<(&str, Username), ModelError> {
        if self.public_token.is_empty() {
            return Err(ModelError::MissingField {
                field: "publicToken".into(),
            });
        }
        let username = Username::parse(&self.username)?;
        Ok((&self.public_token, username))
    }
}
