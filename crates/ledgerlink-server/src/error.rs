//! Error types for the HTTP surface.
//!
//! [`ApiError`] unifies all request-level failure modes and implements
//! [`axum::response::IntoResponse`] so handlers can return
//! `Result<…, ApiError>` directly.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledgerlink_models::ModelError;
use serde_json::json;

use crate::provider::ProviderError;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A cross-origin request came from an origin outside the allow-list.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// The request body could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body parsed but failed validation.
    #[error(transparent)]
    InvalidInput(#[from] ModelError),

    /// A call to the financial-data provider failed.
    #[error("provider request failed")]
    Provider(#[from] ProviderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::OriginRejected(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
        };

        // Provider details stay in the log; the client sees the opaque message.
        match &self {
            Self::Provider(source) => {
                tracing::error!(%status, error = %source, "provider request failed");
            }
            _ => tracing::warn!(%status, error = %self, "request rejected"),
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::OriginRejected("http://evil.example".into()), 403),
            (ApiError::BadRequest("expected JSON".into()), 400),
            (
                ApiError::InvalidInput(ModelError::MissingField {
                    field: "publicToken".into(),
                }),
                400,
            ),
            (
                ApiError::Provider(ProviderError::Decode("bad body".into())),
                502,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }

    #[test]
    fn provider_message_is_opaque() {
        let err = ApiError::Provider(ProviderError::Api {
            status: 400,
            error_type: "INVALID_INPUT".into(),
            error_code: "INVALID_PUBLIC_TOKEN".into(),
            error_message: "provided public token is in an invalid format".into(),
        });
        assert_eq!(err.to_string(), "provider request failed");
    }
}
