//! Physical record shapes exchanged with storage sessions.
//!
//! [`OperationRecord`] is the flat row every operation kind is stored as.
//! The envelope fields are spread over columns; the kind-specific payload is
//! kept as opaque text in `data`.

use chrono::{DateTime, Utc};
use opstore_core::OperationType;
use serde::{Deserialize, Serialize};

/// One stored operation, as seen by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub id: String,
    /// Type tag, fixed at insert.
    pub operation_type: OperationType,
    pub instance_id: String,
    /// Nullable column; `None` and `Some("")` are different values.
    pub orchestration_id: Option<String>,
    /// Storage name of an `OperationState`.
    pub state: String,
    pub description: String,
    /// Empty string when no downstream id has been assigned.
    pub target_operation_id: String,
    /// Serialized payload of the operation kind.
    pub data: String,
    /// Optimistic-lock version. A successful conditional update stores
    /// `version + 1`.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Count of operations of one type in one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatEntry {
    pub operation_type: OperationType,
    pub state: String,
    pub total: usize,
}

/// Count of operations in one state within an orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationStatEntry {
    pub state: String,
    pub total: usize,
}
