//! Caller-facing entry point.
//!
//! [`InputSourceManager`] wires a [`ResourceLocator`] to a [`Reconciler`]:
//! resolve the request, then reconcile (or preview in check mode) and turn
//! the outcome into an [`InputSourceResponse`].

use credsource_models::{Credential, CredentialRef, InputSourceRequest, InputSourceResponse};
use tracing::info;

use crate::backend::{CredentialLookup, InputSourceCollection};
use crate::error::SdkError;
use crate::locator::{CapabilityTable, ResourceLocator};
use crate::reconciler::{Action, Reconciler};

/// Resolves and reconciles [`InputSourceRequest`]s.
#[derive(Debug, Clone)]
pub struct InputSourceManager<L, C> {
    locator: ResourceLocator<L>,
    reconciler: Reconciler<C>,
}

impl<L: CredentialLookup, C: InputSourceCollection> InputSourceManager<L, C> {
    /// Assemble a manager from its two halves.
    pub fn new(locator: ResourceLocator<L>, reconciler: Reconciler<C>) -> Self {
        Self {
            locator,
            reconciler,
        }
    }

    /// The locator half.
    pub fn locator(&self) -> &ResourceLocator<L> {
        &self.locator
    }

    /// The reconciler half.
    pub fn reconciler(&self) -> &Reconciler<C> {
        &self.reconciler
    }

    /// Apply one request.
    ///
    /// In check mode nothing is mutated and `changed` reports what would
    /// change; a would-be creation reports the desired payload without an id.
    pub async fn apply(&self, request: &InputSourceRequest) -> Result<InputSourceResponse, SdkError> {
        let resolved = self.locator.resolve(request).await?;
        let payload = resolved.payload.as_ref();

        if resolved.check_mode {
            let outcome = self.reconciler.preview(&resolved.key, payload, resolved.state).await?;
            let pending_create = outcome.action == Action::Create;
            let mut response = InputSourceResponse::from(outcome);
            if pending_create {
                response.current_payload = resolved.payload.clone();
            }
            return Ok(response);
        }

        let outcome = self.reconciler.reconcile(&resolved.key, payload, resolved.state).await?;
        info!(
            key = %resolved.key,
            changed = outcome.changed,
            action = %outcome.action,
            "request applied"
        );
        Ok(outcome.into())
    }

    /// Advisory: resolve `reference` and confirm it may act as a lookup
    /// source.
    pub async fn check_source(&self, reference: &CredentialRef) -> Result<Credential, SdkError> {
        self.locator.check_source(reference).await
    }
}

impl<B> InputSourceManager<B, B>
where
    B: CredentialLookup + InputSourceCollection + Clone,
{
    /// Build a manager over one backend implementing both traits, loading
    /// its capability table first.
    pub async fn from_backend(backend: B) -> Result<Self, SdkError> {
        let capabilities = CapabilityTable::load(&backend).await?;
        Ok(Self::new(
            ResourceLocator::new(backend.clone(), capabilities),
            Reconciler::new(backend),
        ))
    }
}
