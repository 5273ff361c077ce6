//! Service configuration.
//!
//! Built from environment variables at startup and injected into the
//! provider client, the token store and the router. Command-line flags
//! parsed in `main` may override individual values afterwards.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ledgerlink_models::{CountryCode, LinkSessionRequest, Product};
use tracing::warn;

use crate::gate::ALLOWED_ORIGINS;
use crate::persistence::WriterConfig;

/// Provider environment, selecting the API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PlaidEnvironment {
    /// Test institutions and fake credentials.
    #[default]
    Sandbox,
    /// Real institutions, limited item count.
    Development,
    /// Live traffic.
    Production,
}

impl PlaidEnvironment {
    /// API base URL for this environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

/// Credentials and endpoint of the financial-data provider.
#[derive(Clone)]
pub struct PlaidConfig {
    /// Value of the `PLAID-CLIENT-ID` header.
    pub client_id: String,
    /// Value of the `PLAID-SECRET` header.
    pub secret: String,
    /// Selected environment.
    pub environment: PlaidEnvironment,
    /// API base URL (environment default unless overridden).
    pub base_url: String,
    /// Deadline applied to every provider request.
    pub timeout: Duration,
}

impl std::fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"***")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Global configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Provider connection settings.
    pub plaid: PlaidConfig,
    /// Port to listen on (default `8090`).
    pub listen_port: u16,
    /// Snapshot file of the token store.
    pub db_path: PathBuf,
    /// Snapshot writer retry policy.
    pub writer: WriterConfig,
    /// Metadata sent when opening link sessions.
    pub link: LinkSessionRequest,
    /// Origins admitted on cross-origin requests.
    pub allowed_origins: &'static [&'static str],
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                  | Default        | Description                           |
    /// |---------------------------|----------------|---------------------------------------|
    /// | `PLAID_CLIENT_ID`         | empty          | Provider client id                    |
    /// | `PLAID_SECRET`            | empty          | Provider secret                       |
    /// | `PLAID_ENV`               | `sandbox`      | `sandbox`, `development`, `production` |
    /// | `PLAID_BASE_URL`          | per `PLAID_ENV` | Override the API host (e.g. mock-plaid) |
    /// | `LISTEN_PORT`             | `8090`         | HTTP listen port                      |
    /// | `TOKEN_DB_PATH`           | `tempdb.json`  | Token store snapshot file             |
    /// | `PROVIDER_TIMEOUT_SECS`   | `10`           | Deadline for each provider request    |
    /// | `SNAPSHOT_WRITE_ATTEMPTS` | `3`            | Write attempts per snapshot           |
    /// | `LINK_CLIENT_NAME`        | `TestApp`      | Application name shown in the link UI |
    /// | `LINK_LANGUAGE`           | `en`           | Link UI language                      |
    /// | `LINK_COUNTRY_CODES`      | `CA`           | Comma-separated country codes         |
    /// | `LINK_PRODUCTS`           | `transactions` | Comma-separated products              |
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match var("PLAID_ENV") {
            Some(raw) => PlaidEnvironment::from_str(&raw).unwrap_or_else(|_| {
                warn!(value = %raw, "unknown PLAID_ENV, falling back to sandbox");
                PlaidEnvironment::Sandbox
            }),
            None => PlaidEnvironment::default(),
        };

        let base_url = var("PLAID_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| environment.base_url().to_string());

        let timeout_secs: u64 = var("PROVIDER_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let listen_port: u16 = var("LISTEN_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8090);

        let db_path = var("TOKEN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("tempdb.json"));

        let mut writer = WriterConfig::default();
        if let Some(attempts) = var("SNAPSHOT_WRITE_ATTEMPTS").and_then(|v| v.parse().ok()) {
            writer.max_attempts = attempts;
        }

        let mut link = LinkSessionRequest::default();
        if let Some(name) = var("LINK_CLIENT_NAME") {
            link.client_name = name;
        }
        if let Some(language) = var("LINK_LANGUAGE") {
            link.language = language;
        }
        if let Some(raw) = var("LINK_COUNTRY_CODES") {
            link.country_codes = parse_list("LINK_COUNTRY_CODES", &raw, link.country_codes);
        }
        if let Some(raw) = var("LINK_PRODUCTS") {
            link.products = parse_list("LINK_PRODUCTS", &raw, link.products);
        }

        Self {
            plaid: PlaidConfig {
                client_id: var("PLAID_CLIENT_ID").unwrap_or_default(),
                secret: var("PLAID_SECRET").unwrap_or_default(),
                environment,
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            listen_port,
            db_path,
            writer,
            link,
            allowed_origins: ALLOWED_ORIGINS,
        }
    }
}

/// Parse a comma-separated list, keeping `default` if any entry is invalid
/// or the list is empty.
fn parse_list<T: FromStr>(name: &str, raw: &str, default: Vec<T>) -> Vec<T> {
    let parsed: Result<Vec<T>, _> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(T::from_str)
        .collect();
    match parsed {
        Ok(items) if !items.is_empty() => items,
        _ => {
            warn!(variable = name, value = %raw, "invalid list, keeping default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_with(&[]);
        assert_eq!(cfg.listen_port, 8090);
        assert_eq!(cfg.db_path, PathBuf::from("tempdb.json"));
        assert_eq!(cfg.plaid.environment, PlaidEnvironment::Sandbox);
        assert_eq!(cfg.plaid.base_url, "https://sandbox.plaid.com");
        assert_eq!(cfg.plaid.timeout, Duration::from_secs(10));
        assert_eq!(cfg.writer.max_attempts, 3);
        assert!(cfg.allowed_origins.contains(&"http://localhost:5173"));
    }

    #[test]
    fn environment_selects_host() {
        let cfg = config_with(&[("PLAID_ENV", "production")]);
        assert_eq!(cfg.plaid.environment, PlaidEnvironment::Production);
        assert_eq!(cfg.plaid.base_url, "https://production.plaid.com");
    }

    #[test]
    fn unknown_environment_falls_back_to_sandbox() {
        let cfg = config_with(&[("PLAID_ENV", "staging")]);
        assert_eq!(cfg.plaid.environment, PlaidEnvironment::Sandbox);
    }

    #[test]
    fn base_url_override_strips_trailing_slash() {
        let cfg = config_with(&[("PLAID_BASE_URL", "http://localhost:4010/")]);
        assert_eq!(cfg.plaid.base_url, "http://localhost:4010");
    }

    #[test]
    fn numeric_overrides() {
        let cfg = config_with(&[
            ("LISTEN_PORT", "9000"),
            ("PROVIDER_TIMEOUT_SECS", "3"),
            ("SNAPSHOT_WRITE_ATTEMPTS", "5"),
            ("TOKEN_DB_PATH", "/var/lib/ledgerlink/tokens.json"),
        ]);
        assert_eq!(cfg.listen_port, 9000);
        assert_eq!(cfg.plaid.timeout, Duration::from_secs(3));
        assert_eq!(cfg.writer.max_attempts, 5);
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/ledgerlink/tokens.json"));
    }

    #[test]
    fn link_session_overrides() {
        let cfg = config_with(&[
            ("LINK_CLIENT_NAME", "LedgerLink"),
            ("LINK_LANGUAGE", "fr"),
            ("LINK_COUNTRY_CODES", "CA, US"),
            ("LINK_PRODUCTS", "transactions,auth"),
        ]);
        assert_eq!(cfg.link.client_name, "LedgerLink");
        assert_eq!(cfg.link.language, "fr");
        assert_eq!(cfg.link.country_codes, [CountryCode::Ca, CountryCode::Us]);
        assert_eq!(cfg.link.products, [Product::Transactions, Product::Auth]);
    }

    #[test]
    fn invalid_link_lists_keep_defaults() {
        let cfg = config_with(&[
            ("LINK_COUNTRY_CODES", "CA,XX"),
            ("LINK_PRODUCTS", " , "),
        ]);
        assert_eq!(cfg.link.country_codes, [CountryCode::Ca]);
        assert_eq!(cfg.link.products, [Product::Transactions]);
    }

    #[test]
    fn secret_not_in_debug_output() {
        let cfg = config_with(&[("PLAID_SECRET", "very-secret")]);
        assert!(!format!("{cfg:?}").contains("very-secret"));
    }
}
