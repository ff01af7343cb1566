//! Operation store core: the operation envelope, kind and state tags,
//! per-kind payloads, listing filters, and aggregate statistics.

pub mod filter;
pub mod operation;
pub mod payload;
pub mod types;

pub use filter::{OperationFilter, OperationPage, OperationStats, OrchestrationStats};
pub use operation::{Operation, OperationData, TypedOperation};
pub use payload::{
    DeprovisioningData, DeprovisioningOperation, ProvisioningData, ProvisioningOperation,
    ProvisioningParameters, RuntimeOperation, UpgradeKymaData, UpgradeKymaOperation,
};
pub use types::{OperationState, OperationType, ParseTagError};
