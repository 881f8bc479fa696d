//! Resource locator: turns human-friendly references into identifiers.
//!
//! Resolution never mutates anything. "Zero matches" and "several matches"
//! are expected answers, so the lookup itself returns a [`Lookup`] value;
//! only the convenience wrappers turn them into [`SdkError`]s.
//!
//! Which credential types may act as a lookup source is read-only data
//! ([`CapabilityTable`]) loaded once and injected into the locator.

use std::collections::HashMap;

use credsource_models::{
    Credential, CredentialRef, CredentialType, CredentialTypeId, DesiredState,
    IdentityKey, InputSourcePayload, InputSourceRequest, OrganizationId, OrganizationRef,
};
use tracing::debug;

use crate::backend::CredentialLookup;
use crate::error::SdkError;

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Outcome of resolving a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Exactly one candidate.
    Found(T),
    /// No candidate.
    NotFound,
    /// More than one candidate; all of them are returned.
    Ambiguous(Vec<T>),
}

impl<T> Lookup<T> {
    /// Classify a list of matches.
    pub fn from_matches(mut matches: Vec<T>) -> Self {
        match matches.len() {
            0 => Self::NotFound,
            1 => Self::Found(matches.remove(0)),
            _ => Self::Ambiguous(matches),
        }
    }

    /// Turn the lookup into a result, describing failures with `what` and
    /// naming ambiguous candidates with `label`.
    pub fn into_result(self, what: &str, label: impl Fn(&T) -> String) -> Result<T, SdkError> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound => Err(SdkError::not_found(what)),
            Self::Ambiguous(candidates) => Err(SdkError::Ambiguous {
                what: what.to_string(),
                candidates: candidates.iter().map(label).collect(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// CapabilityTable
// ---------------------------------------------------------------------------

/// Credential types by id, with their lookup-source capability.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    types: HashMap<CredentialTypeId, CredentialType>,
}

impl CapabilityTable {
    /// Build the table from a list of credential types.
    pub fn from_types(types: impl IntoIterator<Item = CredentialType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    /// Fetch every credential type from `lookup` and build the table.
    pub async fn load(lookup: &impl CredentialLookup) -> Result<Self, SdkError> {
        let types = lookup.credential_types().await?;
        debug!(count = types.len(), "credential types loaded");
        Ok(Self::from_types(types))
    }

    /// The credential type with the given id.
    pub fn get(&self, id: CredentialTypeId) -> Option<&CredentialType> {
        self.types.get(&id)
    }

    /// Whether the type may act as a lookup source. `None` for unknown types.
    pub fn is_lookup_source(&self, id: CredentialTypeId) -> Option<bool> {
        self.get(id).map(|t| t.kind.is_lookup_source())
    }

    /// Number of known types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is known.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ResolvedSpec
// ---------------------------------------------------------------------------

/// A request with every reference resolved to an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    /// Identity of the object to reconcile.
    pub key: IdentityKey,
    /// Desired payload; `None` only for `absent`.
    pub payload: Option<InputSourcePayload>,
    /// Desired lifecycle state.
    pub state: DesiredState,
    /// Whether to plan without mutating.
    pub check_mode: bool,
}

// ---------------------------------------------------------------------------
// ResourceLocator
// ---------------------------------------------------------------------------

/// Resolves references against a [`CredentialLookup`].
#[derive(Debug, Clone)]
pub struct ResourceLocator<L> {
    lookup: L,
    capabilities: CapabilityTable,
}

impl<L: CredentialLookup> ResourceLocator<L> {
    /// Create a locator over `lookup` with pre-loaded capability data.
    pub fn new(lookup: L, capabilities: CapabilityTable) -> Self {
        Self {
            lookup,
            capabilities,
        }
    }

    /// The injected capability data.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Resolve an organization reference to its id.
    ///
    /// Identifier references are trusted without a round trip. A name made
    /// of digits is tried both as a name and as an id.
    pub async fn resolve_organization(
        &self,
        reference: &OrganizationRef,
    ) -> Result<OrganizationId, SdkError> {
        let name = match reference {
            OrganizationRef::Id(id) => return Ok(*id),
            OrganizationRef::Name(name) => name,
        };
        let mut matches = self.lookup.find_organizations(name).await?;
        if let Some(id) = reference.id_candidate() {
            if let Some(by_id) = self.lookup.organization(id).await? {
                if matches.iter().all(|o| o.id != by_id.id) {
                    matches.push(by_id);
                }
            }
        }
        Lookup::from_matches(matches)
            .into_result(&format!("organization \"{name}\""), |o| {
                format!("\"{}\" (#{})", o.name, o.id)
            })
            .map(|o| o.id)
    }

    /// Look up a credential reference without failing on zero or many
    /// matches.
    ///
    /// A name made of digits is also tried as an identifier. The id reading
    /// ignores the organization scope, which only narrows names.
    pub async fn locate_credential(
        &self,
        reference: &CredentialRef,
    ) -> Result<Lookup<Credential>, SdkError> {
        match reference {
            CredentialRef::Id(id) => Ok(match self.lookup.credential(*id).await? {
                Some(credential) => Lookup::Found(credential),
                None => Lookup::NotFound,
            }),
            CredentialRef::Name { name, organization } => {
                let organization = match organization {
                    Some(org) => Some(self.resolve_organization(org).await?),
                    None => None,
                };
                let mut matches = self.lookup.find_credentials(name, organization).await?;
                if let Some(id) = reference.id_candidate() {
                    if let Some(by_id) = self.lookup.credential(id).await? {
                        if matches.iter().all(|c| c.id != by_id.id) {
                            matches.push(by_id);
                        }
                    }
                }
                debug!(%reference, matches = matches.len(), "credential lookup");
                Ok(Lookup::from_matches(matches))
            }
        }
    }

    /// Resolve a credential reference, failing with `NotFound` or
    /// `Ambiguous`.
    pub async fn resolve_credential(
        &self,
        reference: &CredentialRef,
    ) -> Result<Credential, SdkError> {
        self.locate_credential(reference)
            .await?
            .into_result(&format!("credential {reference}"), describe)
    }

    /// Resolve every reference in a request.
    ///
    /// The source is only resolved when the desired state needs a payload;
    /// for `absent` it is ignored even when present.
    pub async fn resolve(&self, request: &InputSourceRequest) -> Result<ResolvedSpec, SdkError> {
        request.validate()?;
        let default_org = request.organization.as_ref();

        let target_ref = request
            .target_credential
            .clone()
            .with_default_organization(default_org);
        let target = self.resolve_credential(&target_ref).await?;

        let payload = match (&request.source_credential, request.state.requires_payload()) {
            (Some(source), true) => {
                let source_ref = source.clone().with_default_organization(default_org);
                let source = self.resolve_credential(&source_ref).await?;
                Some(InputSourcePayload {
                    source_credential: source.id,
                    metadata: request.metadata.clone(),
                })
            }
            _ => None,
        };

        Ok(ResolvedSpec {
            key: IdentityKey::new(target.id, request.input_field_name.clone()),
            payload,
            state: request.state,
            check_mode: request.check_mode,
        })
    }

    /// Advisory check that `credential` may act as a lookup source.
    ///
    /// Callers use it to skip a scenario cleanly; the reconciler does not
    /// call it.
    pub fn capability_check(&self, credential: &Credential) -> Result<(), SdkError> {
        match self.capabilities.get(credential.credential_type) {
            Some(ty) if ty.kind.is_lookup_source() => Ok(()),
            Some(ty) => Err(SdkError::Unsupported {
                credential: describe(credential),
                reason: format!("credential type \"{}\" is of kind {}", ty.name, ty.kind),
            }),
            None => Err(SdkError::Unsupported {
                credential: describe(credential),
                reason: format!("unknown credential type {}", credential.credential_type),
            }),
        }
    }

    /// Resolve `reference` and run [`capability_check`](Self::capability_check)
    /// on it.
    pub async fn check_source(&self, reference: &CredentialRef) -> Result<Credential, SdkError> {
        let credential = self.resolve_credential(reference).await?;
        self.capability_check(&credential)?;
        Ok(credential)
    }
}

fn describe(credential: &Credential) -> String {
    format!("\"{}\" (#{})", credential.name, credential.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use credsource_models::CredentialKind;

    #[test]
    fn lookup_from_matches() {
        assert_eq!(Lookup::<u8>::from_matches(vec![]), Lookup::NotFound);
        assert_eq!(Lookup::from_matches(vec![1]), Lookup::Found(1));
        assert_eq!(Lookup::from_matches(vec![1, 2]), Lookup::Ambiguous(vec![1, 2]));
    }

    #[test]
    fn lookup_into_result() {
        let err = Lookup::<u8>::NotFound
            .into_result("credential x", u8::to_string)
            .unwrap_err();
        assert_eq!(err.to_string(), "credential x not found");

        let err = Lookup::Ambiguous(vec![3u8, 4])
            .into_result("credential x", u8::to_string)
            .unwrap_err();
        assert!(matches!(err, SdkError::Ambiguous { ref candidates, .. } if candidates == &["3", "4"]));

        assert_eq!(Lookup::Found(5u8).into_result("x", u8::to_string).unwrap(), 5);
    }

    #[test]
    fn capability_table_answers_per_type() {
        let table = CapabilityTable::from_types([
            CredentialType {
                id: CredentialTypeId::new(1),
                name: "Machine".into(),
                kind: CredentialKind::Ssh,
                fields: vec![],
            },
            CredentialType {
                id: CredentialTypeId::new(2),
                name: "HashiCorp Vault Secret Lookup".into(),
                kind: CredentialKind::External,
                fields: vec![],
            },
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.is_lookup_source(CredentialTypeId::new(1)), Some(false));
        assert_eq!(table.is_lookup_source(CredentialTypeId::new(2)), Some(true));
        assert_eq!(table.is_lookup_source(CredentialTypeId::new(3)), None);
    }
}
