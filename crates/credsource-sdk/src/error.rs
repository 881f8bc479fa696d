//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK. Each variant belongs to one [`ErrorKind`]; callers
//! branch on the kind to decide whether to retry, skip or give up. The SDK
//! itself never retries.

use credsource_models::ModelError;

/// Coarse classification of an [`SdkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced object does not exist.
    NotFound,
    /// A name matched more than one candidate.
    Ambiguous,
    /// The source credential cannot act as a lookup source (advisory).
    Unsupported,
    /// A concurrent writer created the same identity key first.
    Conflict,
    /// The controller returned more than one object for a unique key.
    Inconsistent,
    /// Transport failure or timeout; the whole call may be retried.
    Unavailable,
    /// The request or the resulting link was rejected as invalid.
    Validation,
    /// Anything else (configuration, unexpected status, decoding).
    Other,
}

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// A referenced credential, organization or input source does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of what was looked up.
        what: String,
    },

    /// A name resolved to more than one candidate within its scope.
    #[error("{what} is ambiguous; candidates: {}", candidates.join(", "))]
    Ambiguous {
        /// Description of what was looked up.
        what: String,
        /// Identifiers of every matching candidate.
        candidates: Vec<String>,
    },

    /// The credential's type lacks the lookup-source capability.
    #[error("credential {credential} cannot be used as a lookup source: {reason}")]
    Unsupported {
        /// The credential that was checked.
        credential: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The identity key was taken by a concurrent creation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// More than one object matched a unique identity key.
    #[error("inconsistent controller state: {0}")]
    Inconsistent(String),

    /// Transport failure or timeout. Whether a mutation landed is unknown.
    #[error("controller unavailable: {0}")]
    Unavailable(String),

    /// The request, or the link it describes, is invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid or missing configuration (e.g. bad URL, unreadable file).
    #[error("configuration error: {0}")]
    Config(String),

    /// The controller answered with a status the SDK does not classify.
    #[error("controller returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// HTTP failure that is not a transport problem (e.g. undecodable body).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Shorthand for [`SdkError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// The kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Inconsistent(_) => ErrorKind::Inconsistent,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_)
            | Self::Api { .. }
            | Self::Http(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Other,
        }
    }

    /// Whether re-running the whole reconcile call is a sensible reaction.
    ///
    /// True for transport failures and for lost creation races; the caller
    /// still owns the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable | ErrorKind::Conflict)
    }
}

impl From<ModelError> for SdkError {
    fn from(e: ModelError) -> Self {
        SdkError::Validation(e.to_string())
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
            SdkError::Unavailable(e.to_string())
        } else {
            SdkError::Http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_of_taxonomy_variants() {
        assert_eq!(SdkError::not_found("credential x").kind(), ErrorKind::NotFound);
        assert_eq!(
            SdkError::Ambiguous {
                what: "credential x".into(),
                candidates: vec!["1".into(), "2".into()],
            }
            .kind(),
            ErrorKind::Ambiguous
        );
        assert_eq!(SdkError::Conflict("dup".into()).kind(), ErrorKind::Conflict);
        assert_eq!(
            SdkError::Inconsistent("two".into()).kind(),
            ErrorKind::Inconsistent
        );
        assert_eq!(
            SdkError::Unavailable("timeout".into()).kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(SdkError::Config("bad".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn only_transport_and_races_are_retryable() {
        assert!(SdkError::Unavailable("x".into()).is_retryable());
        assert!(SdkError::Conflict("x".into()).is_retryable());
        assert!(!SdkError::Inconsistent("x".into()).is_retryable());
        assert!(!SdkError::not_found("x").is_retryable());
    }

    #[test]
    fn model_errors_become_validation() {
        let err: SdkError = ModelError::MissingField {
            field: "source_credential".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "validation failed: missing required field: source_credential"
        );
    }

    #[test]
    fn ambiguous_lists_candidates() {
        let err = SdkError::Ambiguous {
            what: "credential \"db\"".into(),
            candidates: vec!["4".into(), "9".into()],
        };
        assert_eq!(
            err.to_string(),
            "credential \"db\" is ambiguous; candidates: 4, 9"
        );
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::Unavailable.to_string(), "unavailable");
    }
}
