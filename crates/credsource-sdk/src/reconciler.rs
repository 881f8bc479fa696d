//! The reconcile state machine.
//!
//! One call reads the current object by identity key, decides the minimal
//! [`Action`], and performs at most one mutating round trip:
//!
//! | desired   | no current object | current object, same payload | current object, other payload |
//! |-----------|-------------------|------------------------------|-------------------------------|
//! | `absent`  | none              | delete                       | delete                        |
//! | `exists`  | create            | none                         | none                          |
//! | `present` | create            | none                         | update (changed fields only)  |
//!
//! Nothing is retried. A lost creation race surfaces as
//! [`SdkError::Conflict`]; re-running the whole call converges.

use credsource_models::{
    CredentialInputSource, DesiredState, IdentityKey, InputSourcePayload, InputSourceResponse,
    PayloadDelta,
};
use tracing::{debug, info, warn};

use crate::backend::InputSourceCollection;
use crate::error::SdkError;

/// The mutation a reconcile call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Nothing to do.
    #[strum(serialize = "none")]
    Noop,
    /// Create the object.
    Create,
    /// Replace the differing payload fields.
    Update,
    /// Delete the object.
    Delete,
}

impl Action {
    /// Whether the action modifies remote state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Noop)
    }
}

/// Result of a reconcile (or preview) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether remote state was (or, in a preview, would be) modified.
    pub changed: bool,
    /// The decided action.
    pub action: Action,
    /// The resulting object; `None` when absent, or when a preview would
    /// create it.
    pub object: Option<CredentialInputSource>,
}

impl Outcome {
    fn unchanged(object: Option<CredentialInputSource>) -> Self {
        Self {
            changed: false,
            action: Action::Noop,
            object,
        }
    }

    fn changed(action: Action, object: Option<CredentialInputSource>) -> Self {
        Self {
            changed: true,
            action,
            object,
        }
    }
}

impl From<Outcome> for InputSourceResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            changed: outcome.changed,
            id: outcome.object.as_ref().map(|o| o.id),
            current_payload: outcome.object.as_ref().map(CredentialInputSource::payload),
        }
    }
}

/// Decision together with the data needed to carry it out.
enum Step<'a> {
    Noop,
    Create(&'a InputSourcePayload),
    Update(&'a CredentialInputSource, PayloadDelta),
    Delete(&'a CredentialInputSource),
}

impl Step<'_> {
    fn action(&self) -> Action {
        match self {
            Self::Noop => Action::Noop,
            Self::Create(_) => Action::Create,
            Self::Update(..) => Action::Update,
            Self::Delete(_) => Action::Delete,
        }
    }
}

fn decide<'a>(
    current: Option<&'a CredentialInputSource>,
    payload: Option<&'a InputSourcePayload>,
    state: DesiredState,
) -> Result<Step<'a>, SdkError> {
    match (state, current) {
        (DesiredState::Absent, None) => Ok(Step::Noop),
        (DesiredState::Absent, Some(current)) => Ok(Step::Delete(current)),
        (DesiredState::Exists, Some(_)) => Ok(Step::Noop),
        (DesiredState::Exists | DesiredState::Present, None) => {
            required(payload, state).map(Step::Create)
        }
        (DesiredState::Present, Some(current)) => {
            let delta = required(payload, state)?.delta_from(&current.payload());
            if delta.is_empty() {
                Ok(Step::Noop)
            } else {
                Ok(Step::Update(current, delta))
            }
        }
    }
}

fn required(
    payload: Option<&InputSourcePayload>,
    state: DesiredState,
) -> Result<&InputSourcePayload, SdkError> {
    payload.ok_or_else(|| {
        SdkError::Validation(format!("state {state} requires a source_credential"))
    })
}

/// Decide the action for a current object and desired payload/state.
///
/// Pure. Fails only when `state` needs a payload and none is given.
pub fn plan(
    current: Option<&CredentialInputSource>,
    payload: Option<&InputSourcePayload>,
    state: DesiredState,
) -> Result<Action, SdkError> {
    decide(current, payload, state).map(|step| step.action())
}

/// Drives one [`InputSourceCollection`] towards desired states.
#[derive(Debug, Clone)]
pub struct Reconciler<C> {
    collection: C,
}

impl<C: InputSourceCollection> Reconciler<C> {
    /// Create a reconciler over `collection`.
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    /// The wrapped collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Read the object stored at `key`.
    ///
    /// More than one match means the remote broke its uniqueness
    /// constraint; that is reported, never repaired.
    pub async fn current(
        &self,
        key: &IdentityKey,
    ) -> Result<Option<CredentialInputSource>, SdkError> {
        let mut found = self.collection.find_by_key(key).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            n => {
                let ids: Vec<String> = found.iter().map(|o| o.id.to_string()).collect();
                warn!(key = %key, count = n, "duplicate input sources for one key");
                Err(SdkError::Inconsistent(format!(
                    "{n} input sources share key {key} (ids {})",
                    ids.join(", ")
                )))
            }
        }
    }

    /// Converge the object at `key` to `state`.
    pub async fn reconcile(
        &self,
        key: &IdentityKey,
        payload: Option<&InputSourcePayload>,
        state: DesiredState,
    ) -> Result<Outcome, SdkError> {
        let current = self.current(key).await?;
        let step = decide(current.as_ref(), payload, state)?;
        let action = step.action();
        info!(
            target_credential = %key.target_credential,
            field = %key.input_field_name,
            %state,
            %action,
            "reconcile"
        );

        let outcome = match step {
            Step::Noop => Outcome::unchanged(current.clone()),
            Step::Create(payload) => {
                let created = self.collection.create(key, payload).await.inspect_err(|e| {
                    if matches!(e, SdkError::Conflict(_)) {
                        warn!(key = %key, "input source created concurrently");
                    }
                })?;
                info!(id = %created.id, key = %key, "input source created");
                Outcome::changed(action, Some(created))
            }
            Step::Update(current, delta) => {
                let updated = self.collection.update(current.id, &delta).await?;
                info!(id = %updated.id, fields = ?delta.fields(), "input source updated");
                Outcome::changed(action, Some(updated))
            }
            Step::Delete(current) => {
                self.collection.delete(current.id).await?;
                info!(id = %current.id, key = %key, "input source deleted");
                Outcome::changed(action, None)
            }
        };
        Ok(outcome)
    }

    /// Report what [`reconcile`](Self::reconcile) would do, without
    /// mutating anything.
    pub async fn preview(
        &self,
        key: &IdentityKey,
        payload: Option<&InputSourcePayload>,
        state: DesiredState,
    ) -> Result<Outcome, SdkError> {
        let current = self.current(key).await?;
        let step = decide(current.as_ref(), payload, state)?;
        debug!(key = %key, %state, action = %step.action(), "preview");

        Ok(match step {
            Step::Noop => Outcome::unchanged(current.clone()),
            Step::Create(_) => Outcome::changed(Action::Create, None),
            Step::Update(current, delta) => {
                let mut simulated = current.clone();
                simulated.apply(&delta);
                Outcome::changed(Action::Update, Some(simulated))
            }
            Step::Delete(_) => Outcome::changed(Action::Delete, None),
        })
    }
}
