//! Typed error hierarchy for the gateway.
//!
//! `GatewayError` covers the four failure kinds the service distinguishes:
//! missing/invalid configuration, upstream call failures, invalid session
//! tokens, and request validation. The HTTP boundary (`gateway::api`) turns
//! each of these into a response; the CLI edge wraps them in `anyhow`.

use thiserror::Error;

/// Errors from the gateway subsystems.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing required configuration: {name}")]
    ConfigMissing { name: &'static str },

    #[error("Invalid configuration for {name}: {message}")]
    ConfigInvalid { name: &'static str, message: String },

    /// Any failed upstream call. `status` is `None` when no response arrived.
    #[error("Upstream call failed ({}): {body}", status_label(.status))]
    Upstream { status: Option<u16>, body: String },

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Invalid request: {0}")]
    Validation(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

impl GatewayError {
    pub fn upstream(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status: Some(status.as_u16()),
            body: body.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_missing_names_the_variable() {
        let err = GatewayError::ConfigMissing {
            name: "GITHUB_APP_ID",
        };
        assert_eq!(
            err.to_string(),
            "Missing required configuration: GITHUB_APP_ID"
        );
    }

    #[test]
    fn upstream_error_carries_status_and_body() {
        let err = GatewayError::upstream(reqwest::StatusCode::NOT_FOUND, "Not Found");
        match &err {
            GatewayError::Upstream { status, body } => {
                assert_eq!(*status, Some(404));
                assert_eq!(body, "Not Found");
            }
            _ => panic!("Expected Upstream"),
        }
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn upstream_error_without_status_is_labelled() {
        let err = GatewayError::Upstream {
            status: None,
            body: "connection refused".into(),
        };
        assert!(err.to_string().contains("no response"));
    }

    #[test]
    fn validation_error_is_matchable() {
        let err = GatewayError::Validation("owner is required".into());
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[test]
    fn gateway_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&GatewayError::InvalidToken);
    }
}
