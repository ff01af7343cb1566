//! The operation envelope and its typed pairing with a payload.
//!
//! Every stored operation shares the [`Operation`] envelope. The
//! type-specific payload lives alongside it in a [`TypedOperation`], whose
//! payload type implements [`OperationData`] and thereby names the
//! [`OperationType`] tag it belongs to.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{OperationState, OperationType};

/// Common envelope carried by every operation regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Globally unique id, assigned at creation.
    pub id: String,
    /// Kind tag; selects the payload codec.
    pub operation_type: OperationType,
    /// The external resource this operation acts on.
    pub instance_id: String,
    /// Set only for operations executed as part of an orchestration.
    pub orchestration_id: Option<String>,
    /// Current status.
    pub state: OperationState,
    /// Human-readable status detail.
    pub description: String,
    /// Tracking id assigned by the downstream system, once known.
    pub target_operation_id: Option<String>,
    /// Set once at insert.
    pub created_at: DateTime<Utc>,
    /// Set on every successful update.
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, advanced by one on every update.
    pub version: i64,
}

impl Operation {
    /// Creates a fresh envelope in the `Pending` state at version 0.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        operation_type: OperationType,
        instance_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            operation_type,
            instance_id: instance_id.into(),
            orchestration_id: None,
            state: OperationState::Pending,
            description: String::new(),
            target_operation_id: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

/// Type-specific payload of an operation kind.
///
/// Implementors are serialized into the opaque `data` text of a stored
/// record. `TYPE` ties the payload to exactly one [`OperationType`]; reading
/// a record of any other type through this payload is rejected.
pub trait OperationData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The type tag records of this payload are stored under.
    const TYPE: OperationType;

    /// Whether operations of this kind always belong to an orchestration.
    const ORCHESTRATED: bool = false;

    /// Called after decoding, with the envelope the payload was stored
    /// alongside. Lets a payload re-derive fields that mirror the envelope.
    fn attach(&mut self, _envelope: &Operation) {}
}

/// An envelope paired with the payload of its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedOperation<D> {
    /// The common envelope.
    pub operation: Operation,
    /// The kind-specific payload.
    pub data: D,
}

impl<D: OperationData> TypedOperation<D> {
    /// Creates a new operation of kind `D::TYPE` with a fresh envelope.
    #[must_use]
    pub fn new(id: impl Into<String>, instance_id: impl Into<String>, data: D) -> Self {
        Self {
            operation: Operation::new(id, D::TYPE, instance_id),
            data,
        }
    }

    /// Sets the orchestration this operation belongs to.
    #[must_use]
    pub fn with_orchestration_id(mut self, orchestration_id: impl Into<String>) -> Self {
        self.operation.orchestration_id = Some(orchestration_id.into());
        self
    }

    /// Sets the state and its description.
    #[must_use]
    pub fn with_state(mut self, state: OperationState, description: impl Into<String>) -> Self {
        self.operation.state = state;
        self.operation.description = description.into();
        self
    }
}

impl<D> Deref for TypedOperation<D> {
    type Target = Operation;

    fn deref(&self) -> &Self::Target {
        &self.operation
    }
}

impl<D> DerefMut for TypedOperation<D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.operation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{DeprovisioningData, ProvisioningData, UpgradeKymaData};

    #[test]
    fn new_envelope_starts_pending_at_version_zero() {
        let op = Operation::new("op-1", OperationType::Provision, "inst-1");
        assert_eq!(op.id, "op-1");
        assert_eq!(op.instance_id, "inst-1");
        assert_eq!(op.state, OperationState::Pending);
        assert_eq!(op.version, 0);
        assert!(op.orchestration_id.is_none());
        assert!(op.target_operation_id.is_none());
        assert_eq!(op.created_at, op.updated_at);
    }

    #[test]
    fn typed_operation_takes_type_from_payload() {
        let op = TypedOperation::new("op-1", "inst-1", ProvisioningData::default());
        assert_eq!(op.operation_type, OperationType::Provision);

        let op = TypedOperation::new("op-2", "inst-1", DeprovisioningData::default());
        assert_eq!(op.operation_type, OperationType::Deprovision);
    }

    #[test]
    fn builders_set_envelope_fields() {
        let op = TypedOperation::new("op-1", "inst-1", UpgradeKymaData::default())
            .with_orchestration_id("orch-1")
            .with_state(OperationState::InProgress, "upgrading");
        assert_eq!(op.orchestration_id.as_deref(), Some("orch-1"));
        assert_eq!(op.state, OperationState::InProgress);
        assert_eq!(op.description, "upgrading");
    }

    #[test]
    fn deref_mut_reaches_envelope() {
        let mut op = TypedOperation::new("op-1", "inst-1", ProvisioningData::default());
        op.target_operation_id = Some("prov-9".to_string());
        assert_eq!(op.operation.target_operation_id.as_deref(), Some("prov-9"));
    }
}
