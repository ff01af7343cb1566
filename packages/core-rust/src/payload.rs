//! Payloads of the three operation kinds.
//!
//! Field names serialize in camelCase, matching the JSON documents the
//! broker keeps in the record's `data` column.

use serde::{Deserialize, Serialize};

use crate::operation::{Operation, OperationData, TypedOperation};
use crate::types::OperationType;

/// Parameters the instance was provisioned with.
///
/// Carried by provisioning and deprovisioning payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningParameters {
    /// Service plan the instance was created from.
    pub plan_id: String,
    /// Service offering id.
    pub service_id: String,
    /// Owning global account.
    pub global_account_id: String,
    /// Owning subaccount.
    pub sub_account_id: String,
    /// Region requested by the platform, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_region: Option<String>,
    /// Runtime name chosen by the user.
    pub name: String,
    /// Explicitly requested Kyma version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyma_version: Option<String>,
}

/// Payload of a provisioning operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningData {
    /// Requested provisioning parameters.
    pub parameters: ProvisioningParameters,
    /// Runtime id, once the runtime has been registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_id: Option<String>,
    /// Console URL reported back to the platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
}

impl OperationData for ProvisioningData {
    const TYPE: OperationType = OperationType::Provision;
}

/// Payload of a deprovisioning operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprovisioningData {
    /// Parameters of the instance being removed.
    pub parameters: ProvisioningParameters,
    /// Runtime being removed, if one was ever registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_id: Option<String>,
    /// Subaccount the runtime belongs to.
    pub sub_account_id: String,
    /// Suspension rather than permanent removal.
    #[serde(default)]
    pub temporary: bool,
}

impl OperationData for DeprovisioningData {
    const TYPE: OperationType = OperationType::Deprovision;
}

/// The runtime a Kyma upgrade targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeOperation {
    /// Mirrors the id of the enclosing operation.
    pub id: String,
    /// Target runtime.
    pub runtime_id: String,
    /// Owning global account.
    pub global_account_id: String,
    /// Owning subaccount.
    pub sub_account_id: String,
    /// Gardener shoot backing the runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot_name: Option<String>,
    /// Start of the runtime's maintenance window (`HHMMSS+ZZZZ`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_begin: Option<String>,
    /// End of the runtime's maintenance window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_window_end: Option<String>,
}

/// Payload of a Kyma upgrade operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeKymaData {
    /// The runtime being upgraded.
    pub runtime_operation: RuntimeOperation,
    /// Version the runtime is upgraded to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kyma_version: Option<String>,
    /// Plan the upgrade without applying it.
    #[serde(default)]
    pub dry_run: bool,
}

impl OperationData for UpgradeKymaData {
    const TYPE: OperationType = OperationType::UpgradeKyma;
    const ORCHESTRATED: bool = true;

    fn attach(&mut self, envelope: &Operation) {
        self.runtime_operation.id.clone_from(&envelope.id);
    }
}

/// A provisioning operation.
pub type ProvisioningOperation = TypedOperation<ProvisioningData>;
/// A deprovisioning operation.
pub type DeprovisioningOperation = TypedOperation<DeprovisioningData>;
/// A Kyma upgrade operation.
pub type UpgradeKymaOperation = TypedOperation<UpgradeKymaData>;
