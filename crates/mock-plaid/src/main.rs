//! Local stand-in for the Plaid API.
//!
//! Implements the endpoints the LedgerLink server calls, with deterministic
//! token formats so a full sign-in can be exercised without provider
//! credentials. Point the server at it with
//! `PLAID_BASE_URL=http://localhost:4010`.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

const PUBLIC_PREFIX: &str = "public-sandbox-";
const ACCESS_PREFIX: &str = "access-sandbox-";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MOCK_PLAID_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4010);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    info!(address = %addr, "mock-plaid listening");
    axum::serve(listener, app()).await.expect("server error");
}

fn app() -> Router {
    Router::new()
        .route("/link/token/create", post(link_token_create))
        .route("/sandbox/public_token/create", post(sandbox_public_token_create))
        .route("/item/public_token/exchange", post(public_token_exchange))
        .route("/accounts/get", post(accounts_get))
}

// --- Endpoints ---

async fn link_token_create(Json(req): Json<Value>) -> Json<Value> {
    info!(client_name = %req["client_name"], "link token requested");
    Json(json!({
        "link_token": format!("link-sandbox-{}", uuid::Uuid::new_v4()),
        "expiration": "2099-01-01T00:00:00Z",
        "request_id": request_id(),
    }))
}

/// Skips the link UI: hands out a public token directly, as Plaid's sandbox does.
async fn sandbox_public_token_create() -> Json<Value> {
    Json(json!({
        "public_token": format!("{PUBLIC_PREFIX}{}", uuid::Uuid::new_v4()),
        "request_id": request_id(),
    }))
}

#[derive(Deserialize)]
struct ExchangeRequest {
    public_token: String,
}

async fn public_token_exchange(Json(req): Json<ExchangeRequest>) -> Response {
    let Some(item) = req.public_token.strip_prefix(PUBLIC_PREFIX) else {
        return plaid_error(
            "INVALID_INPUT",
            "INVALID_PUBLIC_TOKEN",
            "provided public token is in an invalid format",
        );
    };
    info!(item, "public token exchanged");
    Json(json!({
        "access_token": format!("{ACCESS_PREFIX}{item}"),
        "item_id": item,
        "request_id": request_id(),
    }))
    .into_response()
}

#[derive(Deserialize)]
struct AccountsRequest {
    access_token: String,
}

async fn accounts_get(Json(req): Json<AccountsRequest>) -> Response {
    if !req.access_token.starts_with(ACCESS_PREFIX) {
        return plaid_error(
            "INVALID_INPUT",
            "INVALID_ACCESS_TOKEN",
            "provided access token is in an invalid format",
        );
    }
    Json(json!({
        "accounts": [
            account("0", "Plaid Checking", Some(110.0)),
            account("1", "Plaid Saving", Some(210.0)),
            account("2", "Plaid Credit Card", None),
        ],
        "request_id": request_id(),
    }))
    .into_response()
}

// --- Helpers ---

fn account(id: &str, name: &str, current: Option<f64>) -> Value {
    json!({
        "account_id": id,
        "name": name,
        "balances": { "current": current, "available": current, "iso_currency_code": "CAD" },
    })
}

fn plaid_error(error_type: &str, error_code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error_type": error_type,
            "error_code": error_code,
            "error_message": message,
            "display_message": null,
            "request_id": request_id(),
        })),
    )
        .into_response()
}

fn request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;

    use super::*;

    #[tokio::test]
    async fn sandbox_token_exchanges_for_access_token() {
        let server = TestServer::new(app()).unwrap();

        let public: Value = server.post("/sandbox/public_token/create").await.json();
        let public_token = public["public_token"].as_str().unwrap();

        let res = server
            .post("/item/public_token/exchange")
            .json(&json!({ "public_token": public_token }))
            .await;
        res.assert_status_ok();
        let body: Value = res.json();
        assert!(body["access_token"].as_str().unwrap().starts_with(ACCESS_PREFIX));
    }

    #[tokio::test]
    async fn invalid_public_token_returns_plaid_error() {
        let server = TestServer::new(app()).unwrap();

        let res = server
            .post("/item/public_token/exchange")
            .json(&json!({ "public_token": "garbage" }))
            .await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = res.json();
        assert_eq!(body["error_code"], "INVALID_PUBLIC_TOKEN");
    }

    #[tokio::test]
    async fn accounts_require_access_token_format() {
        let server = TestServer::new(app()).unwrap();

        let ok = server
            .post("/accounts/get")
            .json(&json!({ "access_token": "access-sandbox-1" }))
            .await;
        ok.assert_status_ok();
        let body: Value = ok.json();
        assert_eq!(body["accounts"].as_array().unwrap().len(), 3);

        let bad = server
            .post("/accounts/get")
            .json(&json!({ "access_token": "nope" }))
            .await;
        bad.assert_status(StatusCode::BAD_REQUEST);
    }
}
