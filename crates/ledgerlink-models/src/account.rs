//! Account balances returned by the provider.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current balance of a single linked account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountBalance {
    /// Display name of the account (e.g. `Plaid Checking`).
    pub name: String,
    /// Current balance. `None` when the institution does not report one.
    pub current: Option<f64>,
}

impl AccountBalance {
    /// Build a balance entry.
    pub fn new(name: impl Into<String>, current: Option<f64>) -> Self {
        Self {
            name: name.into(),
            current,
        }
    }
}

/// Renders as `Current Balance in {name}: {current}` with six decimals.
/// A missing balance renders as zero.
impl fmt::Display for AccountBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current Balance in {}: {:.6}",
            self.name,
            self.current.unwrap_or_default()
        )
    }
}

/// Render balances as newline-terminated text lines, the body format of
/// the balance endpoints.
pub fn render_balances(balances: &[AccountBalance]) -> String {
    balances.iter().map(|b| format!("{b}\n")).collect()
}
