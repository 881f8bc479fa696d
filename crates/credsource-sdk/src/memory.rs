//! In-process controller.
//!
//! [`MemoryController`] implements both boundary traits against shared
//! in-memory state and enforces what the real controller enforces:
//!
//! * one input source per identity key ([`SdkError::Conflict`]);
//! * referenced credentials must exist ([`SdkError::NotFound`]);
//! * the link rules of [`validate_link`] ([`SdkError::Validation`]).
//!
//! Clones share state, so one instance can back a locator, a reconciler
//! and an HTTP service at the same time.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use credsource_models::{
    validate_link, Credential, CredentialId, CredentialInputSource, CredentialKind,
    CredentialType, CredentialTypeId, IdentityKey, InputSourceId, InputSourcePayload, Metadata,
    Organization, OrganizationId, PayloadDelta,
};
use tracing::debug;

use crate::backend::{CredentialLookup, InputSourceCollection};
use crate::error::SdkError;

/// Message the controller uses when an identity key is already taken.
pub const DUPLICATE_KEY_MESSAGE: &str = "Credential Input Source with this Target credential and Input field name already exists.";

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    organizations: BTreeMap<OrganizationId, Organization>,
    credential_types: BTreeMap<CredentialTypeId, CredentialType>,
    credentials: BTreeMap<CredentialId, Credential>,
    input_sources: BTreeMap<InputSourceId, CredentialInputSource>,
    unavailable: bool,
}

impl State {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_available(&self) -> Result<(), SdkError> {
        if self.unavailable {
            Err(SdkError::Unavailable("controller is not reachable".into()))
        } else {
            Ok(())
        }
    }

    fn credential_type_of(
        &self,
        field: &str,
        id: CredentialId,
    ) -> Result<&CredentialType, SdkError> {
        let credential = self
            .credentials
            .get(&id)
            .ok_or_else(|| SdkError::not_found(format!("{field} {id}")))?;
        self.credential_types
            .get(&credential.credential_type)
            .ok_or_else(|| {
                SdkError::not_found(format!("credential_type {}", credential.credential_type))
            })
    }

    fn check_link(&self, key: &IdentityKey, source: CredentialId) -> Result<(), SdkError> {
        let target_type = self.credential_type_of("target_credential", key.target_credential)?;
        let source_type = self.credential_type_of("source_credential", source)?;
        validate_link(target_type, source_type, &key.input_field_name)?;
        Ok(())
    }

    fn matching(&self, key: &IdentityKey) -> Vec<CredentialInputSource> {
        self.input_sources
            .values()
            .filter(|o| o.has_key(key))
            .cloned()
            .collect()
    }
}

/// Thread-safe in-memory controller.
#[derive(Debug, Clone, Default)]
pub struct MemoryController {
    state: Arc<Mutex<State>>,
}

impl MemoryController {
    /// Empty controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller seeded with a `Default` organization and the stock
    /// credential types: `Machine`, `CyberArk Central Credential Provider
    /// Lookup` and `HashiCorp Vault Secret Lookup`.
    pub fn with_defaults() -> Self {
        let controller = Self::new();
        controller.add_organization("Default");
        controller.add_credential_type(
            "Machine",
            CredentialKind::Ssh,
            &["username", "password", "ssh_key_data", "become_password"],
        );
        controller.add_credential_type(
            "CyberArk Central Credential Provider Lookup",
            CredentialKind::External,
            &["url", "app_id", "client_key", "client_cert", "verify"],
        );
        controller.add_credential_type(
            "HashiCorp Vault Secret Lookup",
            CredentialKind::External,
            &["url", "token", "cacert", "role_id", "secret_id"],
        );
        controller
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Add an organization.
    pub fn add_organization(&self, name: &str) -> Organization {
        let mut state = self.lock();
        let org = Organization {
            id: OrganizationId::new(state.allocate()),
            name: name.to_string(),
        };
        state.organizations.insert(org.id, org.clone());
        org
    }

    /// Add a credential type defining `fields`.
    pub fn add_credential_type(
        &self,
        name: &str,
        kind: CredentialKind,
        fields: &[&str],
    ) -> CredentialType {
        let mut state = self.lock();
        let ty = CredentialType {
            id: CredentialTypeId::new(state.allocate()),
            name: name.to_string(),
            kind,
            fields: fields.iter().map(ToString::to_string).collect(),
        };
        state.credential_types.insert(ty.id, ty.clone());
        ty
    }

    /// Add a credential. Its type and organization must exist.
    pub fn add_credential(
        &self,
        name: &str,
        organization: Option<OrganizationId>,
        credential_type: CredentialTypeId,
    ) -> Result<Credential, SdkError> {
        let mut state = self.lock();
        if !state.credential_types.contains_key(&credential_type) {
            return Err(SdkError::not_found(format!(
                "credential_type {credential_type}"
            )));
        }
        if let Some(org) = organization {
            if !state.organizations.contains_key(&org) {
                return Err(SdkError::not_found(format!("organization {org}")));
            }
        }
        let credential = Credential {
            id: CredentialId::new(state.allocate()),
            name: name.to_string(),
            organization,
            credential_type,
        };
        state.credentials.insert(credential.id, credential.clone());
        Ok(credential)
    }

    /// Remove a credential and, like the controller's cascading foreign
    /// keys, every input source referring to it.
    pub fn remove_credential(&self, id: CredentialId) -> bool {
        let mut state = self.lock();
        let removed = state.credentials.remove(&id).is_some();
        state
            .input_sources
            .retain(|_, o| o.target_credential != id && o.source_credential != id);
        removed
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Every organization.
    pub fn organizations(&self) -> Vec<Organization> {
        self.lock().organizations.values().cloned().collect()
    }

    /// Every credential.
    pub fn credentials(&self) -> Vec<Credential> {
        self.lock().credentials.values().cloned().collect()
    }

    /// The credential type named `name`.
    pub fn credential_type_named(&self, name: &str) -> Option<CredentialType> {
        self.lock()
            .credential_types
            .values()
            .find(|t| t.name == name)
            .cloned()
    }

    /// Every stored input source, ordered by id.
    pub fn input_sources(&self) -> Vec<CredentialInputSource> {
        self.lock().input_sources.values().cloned().collect()
    }

    /// One input source by id.
    pub fn input_source(&self, id: InputSourceId) -> Option<CredentialInputSource> {
        self.lock().input_sources.get(&id).cloned()
    }

    /// Input sources filtered by target and field; `None` matches anything.
    pub fn input_sources_matching(
        &self,
        target_credential: Option<CredentialId>,
        input_field_name: Option<&str>,
    ) -> Vec<CredentialInputSource> {
        self.lock()
            .input_sources
            .values()
            .filter(|o| target_credential.is_none_or(|t| o.target_credential == t))
            .filter(|o| input_field_name.is_none_or(|f| o.input_field_name == f))
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Store an input source without any checks, so that two objects can
    /// share one identity key.
    pub fn force_insert_input_source(
        &self,
        key: &IdentityKey,
        payload: &InputSourcePayload,
    ) -> CredentialInputSource {
        let mut state = self.lock();
        let object = new_object(InputSourceId::new(state.allocate()), key, payload);
        state.input_sources.insert(object.id, object.clone());
        object
    }

    /// Make every boundary call fail with [`SdkError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }
}

fn new_object(
    id: InputSourceId,
    key: &IdentityKey,
    payload: &InputSourcePayload,
) -> CredentialInputSource {
    let now = Utc::now();
    CredentialInputSource {
        id,
        target_credential: key.target_credential,
        input_field_name: key.input_field_name.clone(),
        source_credential: payload.source_credential,
        metadata: payload.metadata.clone(),
        created: Some(now),
        modified: Some(now),
    }
}

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

impl CredentialLookup for MemoryController {
    async fn credential(&self, id: CredentialId) -> Result<Option<Credential>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.credentials.get(&id).cloned())
    }

    async fn find_credentials(
        &self,
        name: &str,
        organization: Option<OrganizationId>,
    ) -> Result<Vec<Credential>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state
            .credentials
            .values()
            .filter(|c| c.name == name)
            .filter(|c| organization.is_none_or(|org| c.organization == Some(org)))
            .cloned()
            .collect())
    }

    async fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.organizations.get(&id).cloned())
    }

    async fn find_organizations(&self, name: &str) -> Result<Vec<Organization>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state
            .organizations
            .values()
            .filter(|o| o.name == name)
            .cloned()
            .collect())
    }

    async fn credential_types(&self) -> Result<Vec<CredentialType>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.credential_types.values().cloned().collect())
    }
}

impl InputSourceCollection for MemoryController {
    async fn find_by_key(&self, key: &IdentityKey) -> Result<Vec<CredentialInputSource>, SdkError> {
        let state = self.lock();
        state.check_available()?;
        Ok(state.matching(key))
    }

    async fn create(
        &self,
        key: &IdentityKey,
        payload: &InputSourcePayload,
    ) -> Result<CredentialInputSource, SdkError> {
        let mut state = self.lock();
        state.check_available()?;
        state.check_link(key, payload.source_credential)?;
        if !state.matching(key).is_empty() {
            return Err(SdkError::Conflict(DUPLICATE_KEY_MESSAGE.into()));
        }
        let object = new_object(InputSourceId::new(state.allocate()), key, payload);
        state.input_sources.insert(object.id, object.clone());
        debug!(id = %object.id, key = %key, "stored input source");
        Ok(object)
    }

    async fn update(
        &self,
        id: InputSourceId,
        delta: &PayloadDelta,
    ) -> Result<CredentialInputSource, SdkError> {
        let mut state = self.lock();
        state.check_available()?;
        let mut object = state
            .input_sources
            .get(&id)
            .cloned()
            .ok_or_else(|| SdkError::not_found(format!("input source {id}")))?;
        object.apply(delta);
        state.check_link(&object.key(), object.source_credential)?;
        object.modified = Some(Utc::now());
        state.input_sources.insert(id, object.clone());
        Ok(object)
    }

    async fn delete(&self, id: InputSourceId) -> Result<(), SdkError> {
        let mut state = self.lock();
        state.check_available()?;
        state
            .input_sources
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| SdkError::not_found(format!("input source {id}")))
    }
}

/// Metadata literal helper for seeding and tests.
pub fn metadata<const N: usize>(pairs: [(&str, &str); N]) -> Metadata {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
