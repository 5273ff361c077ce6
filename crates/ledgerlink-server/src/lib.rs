//! # LedgerLink server
//!
//! Backend for linking bank accounts through a financial-data provider.
//!
//! The service:
//!
//! 1. Signs users in by looking up their stored provider credential, or
//!    opens a link session for users without one.
//! 2. Exchanges the public token produced by the link UI for a long-lived
//!    access token and records it in the [`TokenStore`].
//! 3. Returns account balances for a stored or caller-supplied token.
//!
//! The [`TokenStore`] is the only shared mutable state. It is persisted to a
//! JSON snapshot by a dedicated writer task ([`SnapshotWriter`]), so request
//! handlers never wait on disk I/O.

pub mod config;
pub mod error;
pub mod flow;
pub mod gate;
pub mod persistence;
pub mod provider;
pub mod routes;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use error::ApiError;
pub use flow::{SessionFlow, SignInOutcome};
pub use gate::OriginPolicy;
pub use persistence::{PersistenceError, SnapshotWriter, WriterConfig};
pub use provider::{FinancialProvider, PlaidClient, ProviderError};
pub use routes::{AppState, router};
pub use store::{Insertion, StoreError, TokenStore};
