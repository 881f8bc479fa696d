//! Caller-facing request and response types.
//!
//! An [`InputSourceRequest`] describes the desired link with human-friendly
//! references; the SDK resolves it, reconciles, and answers with an
//! [`InputSourceResponse`].
//!
//! ```rust
//! use credsource_models::{DesiredState, InputSourceRequest};
//!
//! let request = InputSourceRequest::builder("prod-ssh", "password")
//!     .source("cyberark-lookup")
//!     .metadata("object_query", "Safe=X;Object=Y")
//!     .metadata("object_query_format", "Exact")
//!     .organization("Default")
//!     .state(DesiredState::Present)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.metadata.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::credential::{CredentialRef, OrganizationRef};
use crate::error::ModelError;
use crate::id::InputSourceId;
use crate::input_source::{DesiredState, InputSourcePayload, Metadata};

// ---------------------------------------------------------------------------
// InputSourceRequest
// ---------------------------------------------------------------------------

/// Desired configuration of one credential input source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputSourceRequest {
    /// Credential receiving the injected field.
    pub target_credential: CredentialRef,
    /// Field of the target credential to populate.
    pub input_field_name: String,
    /// Credential supplying the value. Required unless `state` is `absent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_credential: Option<CredentialRef>,
    /// Lookup parameters. Missing means "no metadata", never "leave as is".
    #[serde(default)]
    pub metadata: Metadata,
    /// Lifecycle instruction.
    #[serde(default)]
    pub state: DesiredState,
    /// Default organization scope for name references without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationRef>,
    /// Report what would change without mutating anything.
    #[serde(default)]
    pub check_mode: bool,
}

impl InputSourceRequest {
    /// Start building a request for the given target field.
    pub fn builder(
        target_credential: impl Into<CredentialRef>,
        input_field_name: impl Into<String>,
    ) -> InputSourceRequestBuilder {
        InputSourceRequestBuilder::new(target_credential.into(), input_field_name.into())
    }

    /// Check the request is complete for its desired state.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.input_field_name.trim().is_empty() {
            return Err(ModelError::MissingField {
                field: "input_field_name".into(),
            });
        }
        if self.state.requires_payload() && self.source_credential.is_none() {
            return Err(ModelError::MissingField {
                field: "source_credential".into(),
            });
        }
        if let Some(key) = self.metadata.keys().find(|k| k.trim().is_empty()) {
            return Err(ModelError::InvalidMetadata {
                key: key.clone(),
                reason: "metadata keys must not be blank".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InputSourceRequestBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`InputSourceRequest`].
///
/// Created via [`InputSourceRequest::builder`].
#[derive(Debug, Clone)]
pub struct InputSourceRequestBuilder {
    request: InputSourceRequest,
}

impl InputSourceRequestBuilder {
    fn new(target_credential: CredentialRef, input_field_name: String) -> Self {
        Self {
            request: InputSourceRequest {
                target_credential,
                input_field_name,
                source_credential: None,
                metadata: Metadata::new(),
                state: DesiredState::default(),
                organization: None,
                check_mode: false,
            },
        }
    }

    /// Set the source credential.
    pub fn source(mut self, source: impl Into<CredentialRef>) -> Self {
        self.request.source_credential = Some(source.into());
        self
    }

    /// Add one metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the whole metadata mapping.
    pub fn metadata_map(mut self, metadata: Metadata) -> Self {
        self.request.metadata = metadata;
        self
    }

    /// Set the desired state (default `present`).
    pub fn state(mut self, state: DesiredState) -> Self {
        self.request.state = state;
        self
    }

    /// Scope name references to an organization.
    pub fn organization(mut self, organization: impl Into<OrganizationRef>) -> Self {
        self.request.organization = Some(organization.into());
        self
    }

    /// Enable check mode.
    pub fn check_mode(mut self, enabled: bool) -> Self {
        self.request.check_mode = enabled;
        self
    }

    /// Validate and return the request.
    pub fn build(self) -> Result<InputSourceRequest, ModelError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

// ---------------------------------------------------------------------------
// InputSourceResponse
// ---------------------------------------------------------------------------

/// Result of a successful request.
///
/// Failed requests produce an error instead; they carry no `changed` value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputSourceResponse {
    /// Whether the controller state was (or in check mode, would be) modified.
    pub changed: bool,
    /// Id of the resulting object; `None` when absent (or not yet created in
    /// check mode).
    pub id: Option<InputSourceId>,
    /// Payload of the resulting object; `None` when absent.
    pub current_payload: Option<InputSourcePayload>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_present() {
        let req = InputSourceRequest::builder("target", "password")
            .source("lookup")
            .build()
            .unwrap();
        assert_eq!(req.state, DesiredState::Present);
        assert!(req.metadata.is_empty());
        assert!(!req.check_mode);
        assert_eq!(req.source_credential, Some(CredentialRef::name("lookup")));
    }

    #[test]
    fn absent_does_not_need_a_source() {
        let req = InputSourceRequest::builder("target", "password")
            .state(DesiredState::Absent)
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn present_and_exists_need_a_source() {
        for state in [DesiredState::Present, DesiredState::Exists] {
            let err = InputSourceRequest::builder("target", "password")
                .state(state)
                .build()
                .unwrap_err();
            assert_eq!(
                err,
                ModelError::MissingField {
                    field: "source_credential".into()
                }
            );
        }
    }

    #[test]
    fn blank_field_name_rejected() {
        let err = InputSourceRequest::builder("target", "  ")
            .source("lookup")
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingField { .. }));
    }

    #[test]
    fn blank_metadata_key_rejected() {
        let err = InputSourceRequest::builder("target", "password")
            .source("lookup")
            .metadata("", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMetadata { .. }));
    }

    #[test]
    fn request_json_minimal() {
        let req: InputSourceRequest = serde_json::from_str(
            r#"{"target_credential": "prod-ssh", "input_field_name": "password", "state": "absent"}"#,
        )
        .unwrap();
        assert_eq!(req.state, DesiredState::Absent);
        assert!(req.source_credential.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn request_json_full() {
        let req: InputSourceRequest = serde_json::from_str(
            r#"{
                "target_credential": {"name": "prod-ssh", "organization": "Default"},
                "input_field_name": "password",
                "source_credential": 12,
                "metadata": {"object_query": "Safe=X;Object=Y", "object_query_format": "Exact"},
                "state": "exists",
                "check_mode": true
            }"#,
        )
        .unwrap();
        assert_eq!(
            req.target_credential,
            CredentialRef::scoped("prod-ssh", "Default")
        );
        assert_eq!(req.state, DesiredState::Exists);
        assert!(req.check_mode);
        assert_eq!(req.metadata["object_query_format"], "Exact");
    }

    #[test]
    fn response_serializes_absent_as_null() {
        let resp = InputSourceResponse {
            changed: true,
            id: None,
            current_payload: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"changed": true, "id": null, "current_payload": null})
        );
    }
}
