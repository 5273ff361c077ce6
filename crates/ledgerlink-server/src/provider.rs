//! Financial-data provider client.
//!
//! [`FinancialProvider`] is the narrow interface the sign-in flow consumes.
//! [`PlaidClient`] implements it against the Plaid REST API; tests supply
//! their own implementation.

use async_trait::async_trait;
use ledgerlink_models::{AccessToken, AccountBalance, LinkSessionRequest};
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PlaidConfig;

const API_VERSION: &str = "2020-09-14";

/// Errors returned by provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be sent or timed out.
    #[error("failed to reach provider: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error object.
    #[error("provider returned {status} {error_type}/{error_code}: {error_message}")]
    Api {
        status: u16,
        error_type: String,
        error_code: String,
        error_message: String,
    },

    /// Credentials could not be turned into request headers.
    #[error("invalid provider configuration: {0}")]
    Config(String),

    /// The provider's response did not have the expected shape.
    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// Operations the sign-in flow needs from the provider.
#[async_trait]
pub trait FinancialProvider: Send + Sync {
    /// Open a bank-linking session and return its link token.
    async fn create_link_session(
        &self,
        request: &LinkSessionRequest,
    ) -> Result<String, ProviderError>;

    /// Exchange a public token from the link UI for a long-lived access token.
    async fn exchange_public_token(&self, public_token: &str)
    -> Result<AccessToken, ProviderError>;

    /// Fetch the balances of every account reachable with `access_token`.
    async fn get_account_balances(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<AccountBalance>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Serialize)]
struct PublicTokenExchangeRequest<'a> {
    public_token: &'a str,
}

#[derive(Deserialize)]
struct PublicTokenExchangeResponse {
    access_token: String,
}

#[derive(Serialize)]
struct AccountsGetRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<Account>,
}

#[derive(Deserialize)]
struct Account {
    name: String,
    balances: Balances,
}

#[derive(Deserialize)]
struct Balances {
    current: Option<f64>,
}

/// Error object carried by non-2xx provider responses.
#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

// ---------------------------------------------------------------------------
// PlaidClient
// ---------------------------------------------------------------------------

/// HTTP client for the Plaid API.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlaidClient {
    /// Build a client with the credentials and deadline from `config`.
    pub fn new(config: &PlaidConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert("plaid-client-id", header_value(&config.client_id)?);
        let mut secret = header_value(&config.secret)?;
        secret.set_sensitive(true);
        headers.insert("plaid-secret", secret);
        headers.insert("plaid-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    async fn call<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "provider request");

        let res = self.http.post(&url).json(body).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FinancialProvider for PlaidClient {
    async fn create_link_session(
        &self,
        request: &LinkSessionRequest,
    ) -> Result<String, ProviderError> {
        let res: LinkTokenCreateResponse = self.call("/link/token/create", request).await?;
        Ok(res.link_token)
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<AccessToken, ProviderError> {
        let res: PublicTokenExchangeResponse = self
            .call(
                "/item/public_token/exchange",
                &PublicTokenExchangeRequest { public_token },
            )
            .await?;
        Ok(AccessToken::new(res.access_token))
    }

    async fn get_account_balances(
        &self,
        access_token: &AccessToken,
    ) -> Result<Vec<AccountBalance>, ProviderError> {
        let res: AccountsGetResponse = self
            .call(
                "/accounts/get",
                &AccountsGetRequest {
                    access_token: access_token.expose(),
                },
            )
            .await?;
        Ok(res
            .accounts
            .into_iter()
            .map(|a| AccountBalance::new(a.name, a.balances.current))
            .collect())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value).map_err(|e: InvalidHeaderValue| {
        ProviderError::Config(format!("invalid credential header: {e}"))
    })
}

/// Build a [`ProviderError::Api`] from a non-2xx response body.
fn api_error(status: u16, body: &[u8]) -> ProviderError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(err) => ProviderError::Api {
            status,
            error_type: err.error_type,
            error_code: err.error_code,
            error_message: err.error_message,
        },
        Err(_) => ProviderError::Api {
            status,
            error_type: "UNKNOWN".into(),
            error_code: "UNKNOWN".into(),
            error_message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
