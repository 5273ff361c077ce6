//! Origin admission check applied to every route.
//!
//! A request declaring `Sec-Fetch-Mode: cors` must come from an allow-listed
//! origin. Admitted requests get their `Origin` echoed back in
//! `Access-Control-Allow-Origin`.

use axum::extract::{Request, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

/// Origins of the development front-end.
pub const ALLOWED_ORIGINS: &[&str] = &["http://127.0.0.1:5173", "http://localhost:5173"];

const SEC_FETCH_MODE: &str = "sec-fetch-mode";

/// Static allow-list consulted by [`origin_gate`].
#[derive(Debug, Clone, Copy)]
pub struct OriginPolicy {
    allowed: &'static [&'static str],
}

impl OriginPolicy {
    /// Build a policy over a fixed list of origins.
    pub const fn new(allowed: &'static [&'static str]) -> Self {
        Self { allowed }
    }

    /// Decide whether a request with these headers may proceed.
    ///
    /// Returns the origin to echo back, if the request declared one.
    pub fn admit<'h>(&self, headers: &'h HeaderMap) -> Result<Option<&'h HeaderValue>, ApiError> {
        let origin = headers.get(ORIGIN);
        let cors = headers
            .get(SEC_FETCH_MODE)
            .is_some_and(|mode| mode.as_bytes().eq_ignore_ascii_case(b"cors"));

        if cors && !origin.is_some_and(|o| self.allows(o)) {
            let shown = origin
                .and_then(|o| o.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            return Err(ApiError::OriginRejected(shown));
        }
        Ok(origin)
    }

    fn allows(&self, origin: &HeaderValue) -> bool {
        origin
            .to_str()
            .is_ok_and(|o| self.allowed.iter().any(|allowed| *allowed == o))
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::new(ALLOWED_ORIGINS)
    }
}

/// Middleware rejecting disallowed cross-origin requests before the
/// handler runs.
pub async fn origin_gate(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let origin = policy.admit(request.headers())?.cloned();

    let mut response = next.run(request).await;
    if let Some(origin) = origin {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    Ok(response)
}
