//! Sign-in orchestration.
//!
//! Each step consults or updates the [`TokenStore`] and delegates the rest to
//! the [`FinancialProvider`]. Nothing is kept between requests: a user counts
//! as authenticated when the store holds a credential for them.

use std::sync::Arc;

use ledgerlink_models::{AccessToken, AccountBalance, LinkSessionRequest, SignInResponse, Username};
use tracing::{info, warn};

use crate::provider::{FinancialProvider, ProviderError};
use crate::store::{Insertion, TokenStore};

/// Result of the sign-in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The user has a stored credential.
    Authenticated(AccessToken),
    /// The user must complete the link UI with this link token.
    LinkSessionPending(String),
}

impl From<SignInOutcome> for SignInResponse {
    fn from(outcome: SignInOutcome) -> Self {
        match outcome {
            SignInOutcome::Authenticated(token) => Self::AccessToken(token),
            SignInOutcome::LinkSessionPending(link_token) => Self::LinkToken(link_token),
        }
    }
}

/// The sign-in, exchange and balance steps over a shared store.
pub struct SessionFlow {
    store: TokenStore,
    provider: Arc<dyn FinancialProvider>,
    link: LinkSessionRequest,
}

impl SessionFlow {
    /// Combine a store, a provider and the link-session metadata.
    pub fn new(
        store: TokenStore,
        provider: Arc<dyn FinancialProvider>,
        link: LinkSessionRequest,
    ) -> Self {
        Self {
            store,
            provider,
            link,
        }
    }

    /// The credential store this flow reads and writes.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Return the stored credential for `username`, or open a link session.
    ///
    /// Never mutates the store.
    pub async fn sign_in(&self, username: &Username) -> Result<SignInOutcome, ProviderError> {
        if let Some(record) = self.store.lookup(username) {
            info!(%username, "known user signed in");
            return Ok(SignInOutcome::Authenticated(record.access_token));
        }

        let link_token = self.provider.create_link_session(&self.link).await?;
        info!(%username, "link session created for new user");
        Ok(SignInOutcome::LinkSessionPending(link_token))
    }

    /// Exchange a public token, store the credential and return balances.
    ///
    /// The first credential stored for a username wins; a later exchange for
    /// the same username leaves the store unchanged. Balances are fetched
    /// with the freshly issued token either way.
    pub async fn exchange(
        &self,
        public_token: &str,
        username: Username,
    ) -> Result<Vec<AccountBalance>, ProviderError> {
        let access_token = self.provider.exchange_public_token(public_token).await?;

        match self
            .store
            .add_if_absent(username.clone(), access_token.clone())
        {
            Insertion::Inserted => info!(%username, "credential stored"),
            Insertion::Existing(_) => {
                warn!(%username, "user already has a credential, keeping the stored one");
            }
        }

        self.balances(&access_token).await
    }

    /// Fetch balances with a caller-supplied token, bypassing the store.
    pub async fn balances(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<AccountBalance>, ProviderError> {
        let balances = self.provider.get_account_balances(access_token).await?;
        info!(accounts = balances.len(), "balances fetched");
        Ok(balances)
    }
}
