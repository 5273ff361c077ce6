//! HTTP routes.
//!
//! | Route             | Body                              | Response                 |
//! |-------------------|-----------------------------------|--------------------------|
//! | `/signIn`         | raw username                      | JSON `SignInResponse`    |
//! | `/getAccessToken` | JSON `{publicToken, username}`    | balance lines            |
//! | `/getAccounts`    | raw access token                  | balance lines            |
//!
//! Every route sits behind [`origin_gate`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::routing::post;
use axum::{Router, middleware};
use ledgerlink_models::{
    AccessToken, ExchangeRequest, ModelError, SignInResponse, Username, render_balances,
};

use crate::error::ApiError;
use crate::flow::SessionFlow;
use crate::gate::{OriginPolicy, origin_gate};

/// State shared across all handlers.
pub struct AppState {
    /// Sign-in orchestration over the shared token store.
    pub flow: SessionFlow,
}

/// Build the application router.
pub fn router(state: Arc<AppState>, policy: OriginPolicy) -> Router {
    Router::new()
        .route("/signIn", post(sign_in))
        .route("/getAccessToken", post(get_access_token))
        .route("/getAccounts", post(get_accounts))
        .layer(middleware::from_fn_with_state(policy, origin_gate))
        .with_state(state)
}

/// `POST /signIn` — return the stored token or open a link session.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<SignInResponse>, ApiError> {
    let username = Username::parse(&body)?;
    let outcome = state.flow.sign_in(&username).await?;
    Ok(Json(outcome.into()))
}

/// `POST /getAccessToken` — exchange a public token and return balances.
///
/// The body is parsed as JSON whatever its declared content type; the
/// front-end sends it as plain text.
async fn get_access_token(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<String, ApiError> {
    let req: ExchangeRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let (public_token, username) = req.validate()?;

    let balances = state.flow.exchange(public_token, username).await?;
    Ok(render_balances(&balances))
}

/// `POST /getAccounts` — balances for a caller-supplied access token.
async fn get_accounts(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<String, ApiError> {
    if body.trim().is_empty() {
        return Err(ModelError::MissingField {
            field: "accessToken".into(),
        }
        .into());
    }
    let balances = state.flow.balances(&AccessToken::new(body)).await?;
    Ok(render_balances(&balances))
}

#[cfg(test)]
mod tests {
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use ledgerlink_models::LinkSessionRequest;
    use serde_json::Value;

    use super::*;
    use crate::persistence::WriterConfig;
    use crate::store::TokenStore;
    use crate::testing::StubProvider;

    struct Harness {
        server: TestServer,
        state: Arc<AppState>,
        provider: Arc<StubProvider>,
        _dir: tempfile::TempDir,
    }

    async fn harness(provider: StubProvider) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::open(dir.path().join("tempdb.json"), WriterConfig::default())
            .await
            .unwrap();
        let provider = Arc::new(provider);
        let state = Arc::new(AppState {
            flow: SessionFlow::new(store, provider.clone(), LinkSessionRequest::default()),
        });
        let server = TestServer::new(router(state.clone(), OriginPolicy::default())).unwrap();
        Harness {
            server,
            state,
            provider,
            _dir: dir,
        }
    }

    fn cors_mode() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("cors"),
        )
    }

    #[tokio::test]
    async fn alice_links_then_signs_in() {
        let h = harness(StubProvider::default()).await;
        let (mode, cors) = cors_mode();

        // Unknown user: link session, no mutation.
        let res = h
            .server
            .post("/signIn")
            .add_header(ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .add_header(mode, cors)
            .text("alice")
            .await;
        res.assert_status_ok();
        assert_eq!(
            res.header(ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://localhost:5173"
        );
        let body: Value = res.json();
        assert_eq!(body["linkToken"], "link-1");
        assert!(h.state.flow.store().is_empty());

        // Exchange: one record, balances rendered.
        let res = h
            .server
            .post("/getAccessToken")
            .text(r#"{ "publicToken": "pub-1", "username": "alice" }"#)
            .await;
        res.assert_status_ok();
        res.assert_text(
            "Current Balance in Plaid Checking: 110.000000\n\
             Current Balance in Plaid Saving: 210.000000\n",
        );
        let records = h.state.flow.store().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].username.as_str(), "alice");

        // Known user: stored token, no new link session.
        let res = h.server.post("/signIn").text("alice").await;
        res.assert_status_ok();
        res.assert_json(&serde_json::json!({ "accessToken": "access-pub-1" }));
        assert_eq!(h.provider.link_calls(), 1);

        h.state.flow.store().flush().await.unwrap();
        let on_disk = std::fs::read_to_string(h.state.flow.store().path()).unwrap();
        assert_eq!(on_disk, r#"[{"Username":"alice","AccessToken":"access-pub-1"}]"#);
    }

    #[tokio::test]
    async fn disallowed_origin_is_rejected_without_mutation() {
        let h = harness(StubProvider::default()).await;
        let (mode, cors) = cors_mode();

        let res = h
            .server
            .post("/getAccessToken")
            .add_header(ORIGIN, HeaderValue::from_static("http://evil.example"))
            .add_header(mode, cors)
            .text(r#"{ "publicToken": "pub-1", "username": "alice" }"#)
            .await;

        res.assert_status(StatusCode::FORBIDDEN);
        assert!(h.state.flow.store().is_empty());
        assert_eq!(h.provider.exchange_calls(), 0);
    }

    #[tokio::test]
    async fn malformed_exchange_body_is_bad_request() {
        let h = harness(StubProvider::default()).await;

        let res = h.server.post("/getAccessToken").text("{ not json").await;

        res.assert_status(StatusCode::BAD_REQUEST);
        assert!(h.state.flow.store().is_empty());
        assert_eq!(h.provider.exchange_calls(), 0);
    }

    #[tokio::test]
    async fn blank_username_is_bad_request() {
        let h = harness(StubProvider::default()).await;

        let res = h.server.post("/signIn").text("   ").await;

        res.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(h.provider.link_calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_opaque_bad_gateway() {
        let h = harness(StubProvider::failing()).await;

        let res = h
            .server
            .post("/getAccessToken")
            .text(r#"{ "publicToken": "pub-1", "username": "alice" }"#)
            .await;

        res.assert_status(StatusCode::BAD_GATEWAY);
        res.assert_json(&serde_json::json!({ "error": "provider request failed" }));
        assert!(h.state.flow.store().is_empty());
    }

    #[tokio::test]
    async fn get_accounts_uses_supplied_token() {
        let h = harness(StubProvider::default()).await;

        let res = h.server.post("/getAccounts").text("caller-token").await;

        res.assert_status_ok();
        assert!(res.text().starts_with("Current Balance in Plaid Checking"));
        assert_eq!(
            h.provider.last_balance_token(),
            Some(AccessToken::new("caller-token"))
        );
        assert!(h.state.flow.store().is_empty());
    }

    #[tokio::test]
    async fn get_accounts_requires_token() {
        let h = harness(StubProvider::default()).await;

        let res = h.server.post("/getAccounts").await;

        res.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn whitespace_token_is_bad_request() {
        let h = harness(StubProvider::default()).await;

        let res = h.server.post("/getAccounts").text("  \n ").await;

        res.assert_status(StatusCode::BAD_REQUEST);
        assert!(h.provider.last_balance_token().is_none());
    }
}
