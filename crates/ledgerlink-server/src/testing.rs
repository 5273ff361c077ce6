//! In-process provider double for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ledgerlink_models::{AccessToken, AccountBalance, LinkSessionRequest};

use crate::provider::{FinancialProvider, ProviderError};

/// Deterministic provider: link tokens are `link-{n}`, access tokens are
/// `access-{public_token}`, and every token has the same two accounts.
#[derive(Default)]
pub struct StubProvider {
    fail: bool,
    link_calls: AtomicUsize,
    exchange_calls: AtomicUsize,
    last_balance_token: Mutex<Option<AccessToken>>,
}

impl StubProvider {
    /// A provider whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of link sessions requested so far.
    pub fn link_calls(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    /// Number of public-token exchanges attempted so far.
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Access token of the most recent balance request.
    pub fn last_balance_token(&self) -> Option<AccessToken> {
        self.last_balance_token.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::Api {
                status: 400,
                error_type: "INVALID_INPUT".into(),
                error_code: "INVALID_PUBLIC_TOKEN".into(),
                error_message: "stub failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FinancialProvider for StubProvider {
    async fn create_link_session(
        &self,
        _request: &LinkSessionRequest,
    ) -> Result<String, ProviderError> {
        self.check()?;
        let n = self.link_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("link-{n}"))
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<AccessToken, ProviderError> {
        self.check()?;
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(format!("access-{public_token}")))
    }

    async fn get_account_balances(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<AccountBalance>, ProviderError> {
        self.check()?;
        *self.last_balance_token.lock().unwrap() = Some(access_token.clone());
        Ok(vec![
            AccountBalance::new("Plaid Checking", Some(110.0)),
            AccountBalance::new("Plaid Saving", Some(210.0)),
        ])
    }
}
