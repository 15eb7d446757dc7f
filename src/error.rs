//! Error types for relay calls and local form validation.

use thiserror::Error;

/// Failure of a call to the chat relay.
///
/// Non-2xx statuses, network errors and undecodable bodies are all
/// `Transport`; only an explicit `success: false` is `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("rejected by server: {reason:?}")]
    Rejected { reason: Option<String> },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn rejected(reason: Option<String>) -> Self {
        Self::Rejected {
            reason: reason.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }

    /// Server-supplied reason, if the server gave one.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Rejected { reason } => reason.as_deref(),
            Self::Transport(_) => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A required settings field was blank. The display text is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("API URL and model name are required")]
    MissingUrlOrModel,
    #[error("Please enter an API key")]
    MissingKey,
    #[error("Please fill in the API URL and API key")]
    MissingUrlOrKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_reason_is_dropped() {
        assert_eq!(ApiError::rejected(Some("  ".into())).reason(), None);
        assert_eq!(ApiError::rejected(None).reason(), None);
        assert_eq!(
            ApiError::rejected(Some("bad key".into())).reason(),
            Some("bad key")
        );
    }

    #[test]
    fn test_transport_has_no_reason() {
        let err = ApiError::transport("connection refused");
        assert!(err.is_transport());
        assert_eq!(err.reason(), None);
    }
}
