//! Boundary contracts with the controller.
//!
//! Two traits split the remote system along the lines the core uses it:
//!
//! * [`CredentialLookup`]: read-only access to credentials, organizations
//!   and credential types, consumed by the
//!   [`ResourceLocator`](crate::ResourceLocator);
//! * [`InputSourceCollection`]: the managed remote state, consumed by the
//!   [`Reconciler`](crate::Reconciler).
//!
//! [`ControllerClient`](crate::ControllerClient) implements both over HTTP,
//! [`MemoryController`](crate::MemoryController) in process.

use std::future::Future;

use credsource_models::{
    Credential, CredentialId, CredentialInputSource, CredentialType, IdentityKey,
    InputSourceId, InputSourcePayload, Organization, OrganizationId, PayloadDelta,
};

use crate::error::SdkError;

/// Read-only view of the controller's credential registry.
pub trait CredentialLookup: Send + Sync {
    /// Fetch one credential by id. `Ok(None)` when it does not exist.
    fn credential(
        &self,
        id: CredentialId,
    ) -> impl Future<Output = Result<Option<Credential>, SdkError>> + Send;

    /// Every credential named exactly `name`, optionally limited to one
    /// organization.
    fn find_credentials(
        &self,
        name: &str,
        organization: Option<OrganizationId>,
    ) -> impl Future<Output = Result<Vec<Credential>, SdkError>> + Send;

    /// Fetch one organization by id. `Ok(None)` when it does not exist.
    fn organization(
        &self,
        id: OrganizationId,
    ) -> impl Future<Output = Result<Option<Organization>, SdkError>> + Send;

    /// Every organization named exactly `name`.
    fn find_organizations(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<Organization>, SdkError>> + Send;

    /// All credential types, with their capability data.
    fn credential_types(&self) -> impl Future<Output = Result<Vec<CredentialType>, SdkError>> + Send;
}

/// The remote collection of credential input sources.
///
/// Implementations perform exactly one round trip per call and never retry.
pub trait InputSourceCollection: Send + Sync {
    /// Every object stored at `key`. More than one means the remote broke
    /// its uniqueness constraint; the caller decides what to do about it.
    fn find_by_key(
        &self,
        key: &IdentityKey,
    ) -> impl Future<Output = Result<Vec<CredentialInputSource>, SdkError>> + Send;

    /// Create an object. Fails with [`SdkError::Conflict`] when `key` is
    /// already taken.
    fn create(
        &self,
        key: &IdentityKey,
        payload: &InputSourcePayload,
    ) -> impl Future<Output = Result<CredentialInputSource, SdkError>> + Send;

    /// Replace the payload fields named in `delta`.
    fn update(
        &self,
        id: InputSourceId,
        delta: &PayloadDelta,
    ) -> impl Future<Output = Result<CredentialInputSource, SdkError>> + Send;

    /// Delete an object.
    fn delete(&self, id: InputSourceId) -> impl Future<Output = Result<(), SdkError>> + Send;
}
