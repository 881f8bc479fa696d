//! Credentials, credential types and organizations as seen by the reconciler.
//!
//! These are read-only views of objects owned by the controller. The
//! reconciler never mutates them; it only resolves references to their
//! identifiers and reads the capability flags carried by their type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::id::{CredentialId, CredentialTypeId, OrganizationId};

// ---------------------------------------------------------------------------
// CredentialKind
// ---------------------------------------------------------------------------

/// Classification of a credential type.
///
/// Only [`External`](Self::External) types can act as a lookup source for
/// another credential's field.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CredentialKind {
    /// Machine (SSH) credentials.
    Ssh,
    /// Vault passwords.
    Vault,
    /// Network device credentials.
    Net,
    /// Source control credentials.
    Scm,
    /// Cloud provider credentials.
    Cloud,
    /// Container registry credentials.
    Registry,
    /// Personal access tokens.
    Token,
    /// Insights credentials.
    Insights,
    /// Secret lookup plugins (CyberArk, HashiCorp Vault, ...).
    External,
    /// Kubernetes / OpenShift bearer tokens.
    Kubernetes,
    /// Galaxy / Automation Hub tokens.
    Galaxy,
    /// Signing keys.
    Cryptography,
}

impl CredentialKind {
    /// Whether credentials of this kind may supply a field value to another
    /// credential.
    pub fn is_lookup_source(self) -> bool {
        self == Self::External
    }
}

// ---------------------------------------------------------------------------
// CredentialType / Credential / Organization
// ---------------------------------------------------------------------------

/// A credential type and the input fields it defines.
///
/// On the wire the field ids are nested as `inputs.fields[].id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "CredentialTypeRecord", into = "CredentialTypeRecord")]
pub struct CredentialType {
    /// Primary key.
    pub id: CredentialTypeId,
    /// Display name (e.g. `"CyberArk Central Credential Provider Lookup"`).
    pub name: String,
    /// Kind of the type; carries the lookup-source capability.
    pub kind: CredentialKind,
    /// Ids of the input fields a credential of this type defines.
    pub fields: Vec<String>,
}

impl CredentialType {
    /// Whether `field` is one of the inputs this type defines.
    pub fn defines_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// Controller representation of a [`CredentialType`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[doc(hidden)]
pub struct CredentialTypeRecord {
    /// Primary key.
    pub id: CredentialTypeId,
    /// Display name.
    pub name: String,
    /// Kind.
    pub kind: CredentialKind,
    /// Input schema.
    #[serde(default)]
    pub inputs: CredentialTypeInputs,
}

/// Input schema of a credential type; only field ids are kept.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[doc(hidden)]
pub struct CredentialTypeInputs {
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<CredentialTypeField>,
}

/// One declared input field.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[doc(hidden)]
pub struct CredentialTypeField {
    /// Field id.
    pub id: String,
}

impl From<CredentialTypeRecord> for CredentialType {
    fn from(record: CredentialTypeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: record.kind,
            fields: record.inputs.fields.into_iter().map(|f| f.id).collect(),
        }
    }
}

impl From<CredentialType> for CredentialTypeRecord {
    fn from(ty: CredentialType) -> Self {
        Self {
            id: ty.id,
            name: ty.name,
            kind: ty.kind,
            inputs: CredentialTypeInputs {
                fields: ty
                    .fields
                    .into_iter()
                    .map(|id| CredentialTypeField { id })
                    .collect(),
            },
        }
    }
}

/// A credential, reduced to the attributes the reconciler reads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Primary key.
    pub id: CredentialId,
    /// Current name. Not unique across organizations.
    pub name: String,
    /// Owning organization, if any.
    #[serde(default)]
    pub organization: Option<OrganizationId>,
    /// Type of the credential.
    pub credential_type: CredentialTypeId,
}

/// An organization scoping credential names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    /// Primary key.
    pub id: OrganizationId,
    /// Organization name.
    pub name: String,
}

// ---------------------------------------------------------------------------
// OrganizationRef
// ---------------------------------------------------------------------------

/// A human-friendly or direct reference to an organization.
///
/// Parsed text is always a name. A name made only of ASCII digits may also
/// denote an identifier; see [`OrganizationRef::id_candidate`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "RawRef", into = "RawRef")]
pub enum OrganizationRef {
    /// Direct identifier.
    Id(OrganizationId),
    /// Organization name.
    Name(String),
}

impl fmt::Display for OrganizationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl OrganizationRef {
    /// The identifier this reference may denote: the id itself, or a name
    /// that reads as one.
    pub fn id_candidate(&self) -> Option<OrganizationId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(name) => parse_numeric(name).map(OrganizationId::new),
        }
    }
}

impl From<&str> for OrganizationRef {
    fn from(s: &str) -> Self {
        Self::Name(s.to_string())
    }
}

impl From<OrganizationId> for OrganizationRef {
    fn from(id: OrganizationId) -> Self {
        Self::Id(id)
    }
}

impl FromStr for OrganizationRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_reference_text(s)?;
        Ok(Self::from(s))
    }
}

impl From<RawRef> for OrganizationRef {
    fn from(raw: RawRef) -> Self {
        match raw {
            RawRef::Id(id) => Self::Id(OrganizationId::new(id)),
            RawRef::Text(text) => Self::from(text.as_str()),
            RawRef::Named { name, .. } => Self::Name(name),
        }
    }
}

impl From<OrganizationRef> for RawRef {
    fn from(r: OrganizationRef) -> Self {
        match r {
            OrganizationRef::Id(id) => RawRef::Id(id.get()),
            OrganizationRef::Name(name) => RawRef::Text(name),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialRef
// ---------------------------------------------------------------------------

/// A human-friendly or direct reference to a credential.
///
/// Text always parses to a name. When that name is all digits the locator
/// also tries it as an identifier and reports an ambiguity if the two
/// readings disagree. Only [`CredentialRef::Id`] (or a bare JSON integer)
/// is taken as an identifier alone.
///
/// # Examples
///
/// ```
/// use credsource_models::{CredentialId, CredentialRef};
///
/// let digits: CredentialRef = "12".parse().unwrap();
/// assert_eq!(digits, CredentialRef::name("12"));
/// assert_eq!(digits.id_candidate(), Some(CredentialId::new(12)));
///
/// let by_name: CredentialRef = "prod-ssh".parse().unwrap();
/// assert_eq!(by_name.id_candidate(), None);
///
/// assert!("  ".parse::<CredentialRef>().is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "RawRef", into = "RawRef")]
pub enum CredentialRef {
    /// Direct identifier; trusted as-is by the locator.
    Id(CredentialId),
    /// Name, optionally scoped to an organization.
    Name {
        /// Credential name.
        name: String,
        /// Organization scope. `None` searches every organization.
        organization: Option<OrganizationRef>,
    },
}

impl CredentialRef {
    /// Unscoped name reference.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            organization: None,
        }
    }

    /// Name reference scoped to an organization.
    pub fn scoped(name: impl Into<String>, organization: impl Into<OrganizationRef>) -> Self {
        Self::Name {
            name: name.into(),
            organization: Some(organization.into()),
        }
    }

    /// Apply a default organization scope to an unscoped name reference.
    ///
    /// Identifier references and already-scoped names are returned unchanged.
    #[must_use]
    pub fn with_default_organization(self, default: Option<&OrganizationRef>) -> Self {
        match self {
            Self::Name {
                name,
                organization: None,
            } => Self::Name {
                name,
                organization: default.cloned(),
            },
            other => other,
        }
    }

    /// The identifier this reference may denote: the id itself, or a name
    /// that reads as one.
    pub fn id_candidate(&self) -> Option<CredentialId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name { name, .. } => parse_numeric(name).map(CredentialId::new),
        }
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Name {
                name,
                organization: None,
            } => f.write_str(name),
            Self::Name {
                name,
                organization: Some(org),
            } => write!(f, "{name} (organization {org})"),
        }
    }
}

impl From<&str> for CredentialRef {
    fn from(s: &str) -> Self {
        Self::name(s)
    }
}

impl From<CredentialId> for CredentialRef {
    fn from(id: CredentialId) -> Self {
        Self::Id(id)
    }
}

impl FromStr for CredentialRef {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_reference_text(s)?;
        Ok(Self::from(s))
    }
}

impl From<RawRef> for CredentialRef {
    fn from(raw: RawRef) -> Self {
        match raw {
            RawRef::Id(id) => Self::Id(CredentialId::new(id)),
            RawRef::Text(text) => Self::from(text.as_str()),
            RawRef::Named { name, organization } => Self::Name {
                name,
                organization: organization.map(OrganizationRef::from),
            },
        }
    }
}

impl From<CredentialRef> for RawRef {
    fn from(r: CredentialRef) -> Self {
        match r {
            CredentialRef::Id(id) => RawRef::Id(id.get()),
            CredentialRef::Name {
                name,
                organization: None,
            } => RawRef::Text(name),
            CredentialRef::Name {
                name,
                organization: Some(org),
            } => RawRef::Named {
                name,
                organization: Some(RawOrg::from(org)),
            },
        }
    }
}

/// Wire form shared by both reference types: an integer, a string, or
/// `{"name": ..., "organization": ...}`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
#[doc(hidden)]
pub enum RawRef {
    /// Bare integer.
    Id(u64),
    /// Bare string, read as a name.
    Text(String),
    /// Explicit name with optional scope.
    Named {
        /// Name.
        name: String,
        /// Organization scope.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        organization: Option<RawOrg>,
    },
}

/// Organization scope inside a [`RawRef::Named`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
#[doc(hidden)]
pub enum RawOrg {
    /// Bare integer.
    Id(u64),
    /// Bare string.
    Text(String),
}

impl From<OrganizationRef> for RawOrg {
    fn from(r: OrganizationRef) -> Self {
        match r {
            OrganizationRef::Id(id) => Self::Id(id.get()),
            OrganizationRef::Name(name) => Self::Text(name),
        }
    }
}

impl From<RawOrg> for OrganizationRef {
    fn from(raw: RawOrg) -> Self {
        match raw {
            RawOrg::Id(id) => Self::Id(OrganizationId::new(id)),
            RawOrg::Text(text) => Self::from(text.as_str()),
        }
    }
}

fn check_reference_text(s: &str) -> Result<(), ModelError> {
    if s.trim().is_empty() {
        return Err(ModelError::InvalidReference {
            value: s.to_string(),
            reason: "expected a name or an id".into(),
        });
    }
    Ok(())
}

fn parse_numeric(s: &str) -> Option<u64> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
