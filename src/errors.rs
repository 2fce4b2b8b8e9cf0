//! Error taxonomy for the request pipeline and session lifecycle. The client
//! never swallows errors; it only classifies them so callers can branch on
//! the flags below instead of raw status codes.

use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// Invalid configuration or client construction failure.
    #[error("Config error: {0}")]
    Config(String),

    /// Transport failure with no HTTP status.
    #[error("Unable to reach the server: {0}")]
    Network(String),

    /// Fail-fast deadline exceeded; the caller may retry.
    #[error("Request timed out. Please try again.")]
    Timeout,

    /// The CSRF bootstrap call itself failed.
    #[error("CSRF bootstrap failed: {0}")]
    Bootstrap(String),

    /// 401 — unauthenticated. The session store keys on this flag.
    #[error("{message}")]
    Auth { message: String },

    /// 419 — the CSRF token no longer matches the server's cookie.
    #[error("{message}")]
    CsrfMismatch { message: String },

    /// 422 — field-level validation errors, surfaced verbatim.
    #[error("{message}")]
    Validation {
        message: String,
        errors: HashMap<String, Vec<String>>,
    },

    /// 5xx or unrecognized status.
    #[error("Request failed ({status}): {message}")]
    Server { status: u16, message: String },

    /// A 2xx body that failed to deserialize.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True for 401 responses; the session is gone on the server side.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }

    /// True for 419 responses; the browser's cookie state is untrustworthy.
    #[must_use]
    pub fn is_csrf_mismatch(&self) -> bool {
        matches!(self, ApiError::CsrfMismatch { .. })
    }

    /// True when the failure never reached the server and a retry is sane.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout)
    }

    /// Field-level validation errors, when present.
    #[must_use]
    pub fn field_errors(&self) -> Option<&HashMap<String, Vec<String>>> {
        match self {
            ApiError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Trims and truncates an HTTP error body for user-facing messages.
pub(crate) fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_flags() {
        let auth = ApiError::Auth {
            message: "Unauthenticated.".to_string(),
        };
        assert!(auth.is_auth_error());
        assert!(!auth.is_csrf_mismatch());
        assert!(!auth.is_retryable());

        let mismatch = ApiError::CsrfMismatch {
            message: "CSRF token mismatch.".to_string(),
        };
        assert!(mismatch.is_csrf_mismatch());
        assert!(!mismatch.is_auth_error());

        assert!(ApiError::Timeout.is_retryable());
        assert!(ApiError::Network("connection refused".to_string()).is_retryable());
        assert!(!ApiError::Server {
            status: 500,
            message: "boom".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn field_errors_only_on_validation() {
        let mut errors = HashMap::new();
        errors.insert(
            "email".to_string(),
            vec!["The email field is required.".to_string()],
        );
        let validation = ApiError::Validation {
            message: "The given data was invalid.".to_string(),
            errors,
        };

        let fields = validation.field_errors().expect("expected field errors");
        assert_eq!(fields["email"].len(), 1);
        assert!(ApiError::Timeout.field_errors().is_none());
    }

    #[test]
    fn sanitize_body_trims_and_truncates() {
        assert_eq!(sanitize_body("   "), "Request failed.");
        assert_eq!(sanitize_body("  oops \n"), "oops");

        let long = "x".repeat(500);
        assert_eq!(sanitize_body(&long).chars().count(), 200);
    }
}
