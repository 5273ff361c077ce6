//! Link-session parameters.
//!
//! A [`LinkSessionRequest`] describes the client metadata sent to the
//! provider when a new bank-linking session is opened. The defaults match
//! the demo front-end: a Canadian, English-language `transactions` link for
//! an application named `TestApp`.

use serde::{Deserialize, Serialize};

/// ISO-3166 country codes accepted by the provider's link UI.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CountryCode {
    /// Canada.
    Ca,
    /// United States.
    Us,
    /// United Kingdom.
    Gb,
    /// France.
    Fr,
}

/// Provider products a link session can request.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Product {
    /// Transaction history (includes balances).
    Transactions,
    /// Account and routing numbers.
    Auth,
    /// Real-time balance.
    Balance,
    /// Account-holder identity.
    Identity,
}

/// End-user identifier attached to a link session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkUser {
    /// Stable identifier of the end user on the client side.
    pub client_user_id: String,
}

/// Client metadata for opening a link session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkSessionRequest {
    /// Application name shown in the link UI.
    pub client_name: String,
    /// Link UI language.
    pub language: String,
    /// Countries whose institutions are offered.
    pub country_codes: Vec<CountryCode>,
    /// Products requested for the linked item.
    pub products: Vec<Product>,
    /// End user the session is opened for.
    pub user: LinkUser,
}

impl Default for LinkSessionRequest {
    fn default() -> Self {
        Self {
            client_name: "TestApp".to_string(),
            language: "en".to_string(),
            country_codes: vec![CountryCode::Ca],
            products: vec![Product::Transactions],
            user: LinkUser {
                client_user_id: "test-user".to_string(),
            },
        }
    }
}
