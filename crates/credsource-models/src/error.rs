//! Error types for the `credsource-models` crate.
//!
//! All validating constructors and link rules in this crate return variants
//! of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A required field was missing.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A credential or organization reference could not be interpreted.
    #[error("invalid reference \"{value}\": {reason}")]
    InvalidReference {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A metadata entry was malformed.
    #[error("invalid metadata entry \"{key}\": {reason}")]
    InvalidMetadata {
        /// The offending key.
        key: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The target/source/field combination breaks a link rule.
    #[error("{field}: {reason}")]
    InvalidLink {
        /// The request field the rule applies to.
        field: String,
        /// Human-readable explanation.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_missing_field() {
        let err = ModelError::MissingField {
            field: "source_credential".into(),
        };
        assert_eq!(err.to_string(), "missing required field: source_credential");
    }

    #[test]
    fn error_display_reference() {
        let err = ModelError::InvalidReference {
            value: "a=b".into(),
            reason: "expected a name or an id".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid reference \"a=b\": expected a name or an id"
        );
    }

    #[test]
    fn error_display_metadata() {
        let err = ModelError::InvalidMetadata {
            key: "query".into(),
            reason: "expected KEY=VALUE".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid metadata entry \"query\": expected KEY=VALUE"
        );
    }

    #[test]
    fn error_display_link() {
        let err = ModelError::InvalidLink {
            field: "source_credential".into(),
            reason: "Source must be an external credential".into(),
        };
        assert_eq!(
            err.to_string(),
            "source_credential: Source must be an external credential"
        );
    }
}
