#![deny(missing_docs)]

//! # LedgerLink Models
//!
//! Wire and storage types shared by the LedgerLink backend and its tooling.
//!
//! ## Credential flow
//!
//! ```text
//! POST /signIn (username)
//! ├── known user   → SignInResponse::AccessToken
//! └── unknown user → SignInResponse::LinkToken
//!                     └── POST /getAccessToken (ExchangeRequest)
//!                         ├── UserRecord persisted
//!                         └── AccountBalance lines returned
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`user`] | `Username`, `AccessToken`, persisted `UserRecord` |
//! | [`account`] | `AccountBalance` and its text rendering |
//! | [`link`] | Link-session parameters (`LinkSessionRequest`, `CountryCode`, `Product`) |
//! | [`session`] | HTTP request / response bodies of the sign-in flow |

pub mod account;
pub mod error;
pub mod link;
pub mod session;
pub mod user;

// Re-export all public types at crate root for convenience.
pub use account::*;
pub use error::*;
pub use link::*;
pub use session::*;
pub use user::*;
