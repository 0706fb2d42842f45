//! Typed failures of the remote mail service

use thiserror::Error;

/// Remote response codes that indicate a credential or impersonation problem
const AUTHENTICATION_CODES: &[&str] = &[
    "ErrorImpersonateUserDenied",
    "ErrorImpersonationDenied",
    "ErrorImpersonationFailed",
    "ErrorInvalidCredentials",
];

/// Failure of one remote call.
///
/// Travels inside `anyhow::Error` through the engine; recover it with
/// `err.downcast_ref::<ServiceError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The call could not be completed or returned a non-success status
    #[error("transport failure{}: {message}", status_suffix(.status))]
    Transport { status: Option<u16>, message: String },

    /// The call completed but the response was empty or malformed
    #[error("protocol failure: {0}")]
    Protocol(String),

    /// The server parsed the request and reported an application error
    #[error("remote error {code}: {message}")]
    Remote { code: String, message: String },

    /// Credentials or impersonation rights were rejected
    #[error("authentication failure: {0}")]
    Authentication(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ServiceError {
    /// Classify a remote response code
    pub fn from_response_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        if AUTHENTICATION_CODES.contains(&code.as_str()) {
            Self::Authentication(format!("{}: {}", code, message))
        } else {
            Self::Remote { code, message }
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// HTTP status, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Remote response code, when the server reported one
    pub fn response_code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impersonation_codes_are_authentication() {
        let err = ServiceError::from_response_code("ErrorImpersonateUserDenied", "denied");
        assert!(err.is_authentication());
        assert!(err.response_code().is_none());
    }

    #[test]
    fn test_access_denied_is_remote() {
        let err = ServiceError::from_response_code("ErrorAccessDenied", "no rights");
        assert!(!err.is_authentication());
        assert_eq!(err.response_code(), Some("ErrorAccessDenied"));
    }

    #[test]
    fn test_other_codes_are_remote() {
        let err = ServiceError::from_response_code("ErrorFolderNotFound", "gone");
        assert_eq!(err.response_code(), Some("ErrorFolderNotFound"));
        assert_eq!(err.to_string(), "remote error ErrorFolderNotFound: gone");
    }

    #[test]
    fn test_transport_display_includes_status() {
        let err = ServiceError::Transport {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "transport failure (HTTP 503): unavailable");

        let err = ServiceError::Transport {
            status: None,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "transport failure: connection reset");
    }

    #[test]
    fn test_survives_anyhow_roundtrip() {
        let err: anyhow::Error = ServiceError::protocol("empty response").into();
        let err = err.context("Failed to list folders");
        assert_eq!(
            err.downcast_ref::<ServiceError>(),
            Some(&ServiceError::Protocol("empty response".to_string()))
        );
    }
}
