use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TokenError>;

/// Failure taxonomy for token operations.
///
/// Every token-state variant is terminal for the presented token: a
/// retry with the same token cannot succeed. `StoreUnavailable` is the
/// only variant eligible for caller-side retry.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Malformed or forged token")]
    MalformedOrForged,

    #[error("Token not found")]
    NotFound,

    #[error("Token expired")]
    Expired,

    #[error("Token usage exhausted")]
    UsageExhausted,

    #[error("Token revoked")]
    Revoked,

    #[error("Token purpose mismatch")]
    PurposeMismatch,

    #[error("Device fingerprint mismatch")]
    DeviceMismatch,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Stable machine-readable code surfaced to consumers so the
    /// frontend can render purpose-specific guidance.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::MalformedOrForged => "malformed_token",
            TokenError::NotFound => "token_not_found",
            TokenError::Expired => "token_expired",
            TokenError::UsageExhausted => "usage_exhausted",
            TokenError::Revoked => "token_revoked",
            TokenError::PurposeMismatch => "purpose_mismatch",
            TokenError::DeviceMismatch => "device_mismatch",
            TokenError::StoreUnavailable(_) => "store_unavailable",
            TokenError::Internal(_) => "internal_error",
        }
    }

    /// Whether a retry could succeed. Token-state failures never can;
    /// only infrastructure failures qualify for retry/backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TokenError::StoreUnavailable(_) | TokenError::Internal(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TokenError::MalformedOrForged => StatusCode::BAD_REQUEST,
            TokenError::NotFound => StatusCode::NOT_FOUND,
            TokenError::Revoked | TokenError::PurposeMismatch | TokenError::DeviceMismatch => {
                StatusCode::FORBIDDEN
            }
            TokenError::Expired | TokenError::UsageExhausted => StatusCode::GONE,
            TokenError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TokenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the link recipient. Deliberately specific:
    /// the security of these links rests on expiry, usage, and purpose
    /// scoping rather than secrecy, so naming the rejection reason does
    /// not weaken the system.
    pub fn user_message(&self) -> &'static str {
        match self {
            TokenError::MalformedOrForged => {
                "This link is not valid. Request a fresh link from your email."
            }
            TokenError::NotFound => "This link is no longer recognized. Request a new one.",
            TokenError::Expired => "This link has expired. Request a new one.",
            TokenError::UsageExhausted => {
                "This link was already used the maximum number of times. Request a new one."
            }
            TokenError::Revoked => "This link has been deactivated.",
            TokenError::PurposeMismatch => "This link cannot be used for this action.",
            TokenError::DeviceMismatch => {
                "This link was opened from an unrecognized device. Request a new one."
            }
            TokenError::StoreUnavailable(_) => {
                "Service temporarily unavailable. Please try again shortly."
            }
            TokenError::Internal(_) => "Something went wrong. Please try again shortly.",
        }
    }
}

// Conversions from external error types
impl From<sqlx::Error> for TokenError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        TokenError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code(),
            "message": self.user_message(),
            "retryable": self.is_retryable(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TokenError::MalformedOrForged,
            TokenError::NotFound,
            TokenError::Expired,
            TokenError::UsageExhausted,
            TokenError::Revoked,
            TokenError::PurposeMismatch,
            TokenError::DeviceMismatch,
            TokenError::StoreUnavailable("down".into()),
            TokenError::Internal("boom".into()),
        ];

        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_only_infrastructure_failures_are_retryable() {
        assert!(TokenError::StoreUnavailable("down".into()).is_retryable());
        assert!(!TokenError::Expired.is_retryable());
        assert!(!TokenError::UsageExhausted.is_retryable());
        assert!(!TokenError::Revoked.is_retryable());
        assert!(!TokenError::MalformedOrForged.is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            TokenError::MalformedOrForged.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(TokenError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(TokenError::Expired.status_code(), StatusCode::GONE);
        assert_eq!(TokenError::UsageExhausted.status_code(), StatusCode::GONE);
        assert_eq!(TokenError::Revoked.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            TokenError::StoreUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
