//! The managed object: a credential input source.
//!
//! A credential input source wires one field of a *target* credential to a
//! *source* credential that resolves the value at run time, using
//! source-specific [`Metadata`] (e.g. a vault object query).
//!
//! The object is split in two halves:
//!
//! ```text
//! CredentialInputSource
//! ├── IdentityKey          (target_credential, input_field_name)  immutable
//! └── InputSourcePayload   (source_credential, metadata)          mutable
//! ```
//!
//! At most one input source exists per [`IdentityKey`]. Swapping the source
//! or editing the metadata is an update of the same object.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{CredentialId, InputSourceId};

/// Source-specific lookup parameters.
///
/// Compared structurally: an absent key is not the same as a key mapped to
/// an empty string.
pub type Metadata = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// The immutable identity of a credential input source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    /// Credential receiving the injected field.
    pub target_credential: CredentialId,
    /// Field of the target credential that is populated.
    pub input_field_name: String,
}

impl IdentityKey {
    /// Build a key from its two parts.
    pub fn new(target_credential: CredentialId, input_field_name: impl Into<String>) -> Self {
        Self {
            target_credential,
            input_field_name: input_field_name.into(),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target_credential, self.input_field_name)
    }
}

// ---------------------------------------------------------------------------
// InputSourcePayload
// ---------------------------------------------------------------------------

/// The mutable attributes of a credential input source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InputSourcePayload {
    /// Credential supplying the value.
    pub source_credential: CredentialId,
    /// Lookup parameters handed to the source at resolution time.
    #[serde(default)]
    pub metadata: Metadata,
}

impl InputSourcePayload {
    /// Payload with no metadata.
    pub fn new(source_credential: CredentialId) -> Self {
        Self {
            source_credential,
            metadata: Metadata::new(),
        }
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The changes needed to turn `current` into `self`.
    ///
    /// Empty when both payloads are identical.
    pub fn delta_from(&self, current: &Self) -> PayloadDelta {
        PayloadDelta {
            source_credential: (self.source_credential != current.source_credential)
                .then_some(self.source_credential),
            metadata: (self.metadata != current.metadata).then(|| self.metadata.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// PayloadDelta
// ---------------------------------------------------------------------------

/// The payload fields an update replaces. `None` fields are left untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PayloadDelta {
    /// New source credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_credential: Option<CredentialId>,
    /// New metadata, replacing the stored mapping wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl PayloadDelta {
    /// Whether the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.source_credential.is_none() && self.metadata.is_none()
    }

    /// Names of the fields this delta replaces.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.source_credential.is_some() {
            fields.push("source_credential");
        }
        if self.metadata.is_some() {
            fields.push("metadata");
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// CredentialInputSource
// ---------------------------------------------------------------------------

/// A credential input source as stored by the controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialInputSource {
    /// Primary key.
    pub id: InputSourceId,
    /// Credential receiving the injected field.
    pub target_credential: CredentialId,
    /// Field of the target credential that is populated.
    pub input_field_name: String,
    /// Credential supplying the value.
    pub source_credential: CredentialId,
    /// Lookup parameters.
    #[serde(default)]
    pub metadata: Metadata,
    /// Creation time reported by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Last modification time reported by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl CredentialInputSource {
    /// The identity half of the object.
    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(self.target_credential, self.input_field_name.clone())
    }

    /// The mutable half of the object.
    pub fn payload(&self) -> InputSourcePayload {
        InputSourcePayload {
            source_credential: self.source_credential,
            metadata: self.metadata.clone(),
        }
    }

    /// Apply an update in place. Identity fields are never touched.
    pub fn apply(&mut self, delta: &PayloadDelta) {
        if let Some(source) = delta.source_credential {
            self.source_credential = source;
        }
        if let Some(metadata) = &delta.metadata {
            self.metadata.clone_from(metadata);
        }
    }

    /// Whether the object sits at `key`.
    pub fn has_key(&self, key: &IdentityKey) -> bool {
        self.target_credential == key.target_credential
            && self.input_field_name == key.input_field_name
    }
}

// ---------------------------------------------------------------------------
// DesiredState
// ---------------------------------------------------------------------------

/// Lifecycle instruction for one reconcile call. Never stored.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DesiredState {
    /// The object exists with exactly the requested payload.
    #[default]
    Present,
    /// The object exists; an existing payload is left as it is.
    Exists,
    /// No object exists at the key.
    Absent,
}

impl DesiredState {
    /// Whether this state needs a payload to act on.
    pub fn requires_payload(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
