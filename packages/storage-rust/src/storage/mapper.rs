//! Envelope <-> record mapping.

use opstore_core::Operation;

use super::record::OperationRecord;
use crate::error::StoreError;

/// Spreads an envelope over record columns. `data` is left empty for the
/// payload codec to fill.
#[must_use]
pub fn to_record(operation: &Operation) -> OperationRecord {
    OperationRecord {
        id: operation.id.clone(),
        operation_type: operation.operation_type,
        instance_id: operation.instance_id.clone(),
        orchestration_id: operation.orchestration_id.clone(),
        state: operation.state.as_str().to_string(),
        description: operation.description.clone(),
        target_operation_id: operation.target_operation_id.clone().unwrap_or_default(),
        data: String::new(),
        version: operation.version,
        created_at: operation.created_at,
        updated_at: operation.updated_at,
    }
}

/// Rebuilds an envelope from record columns.
///
/// An empty `target_operation_id` column reads back as `None`.
///
/// Not total: `OperationState` is a closed set, so a state column outside
/// it is rejected instead of being carried through.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the stored state is not a known
/// `OperationState`.
pub fn from_record(record: &OperationRecord) -> Result<Operation, StoreError> {
    let state = record.state.parse().map_err(|err| StoreError::Codec {
        id: record.id.clone(),
        reason: format!("{err}"),
    })?;

    Ok(Operation {
        id: record.id.clone(),
        operation_type: record.operation_type,
        instance_id: record.instance_id.clone(),
        orchestration_id: record.orchestration_id.clone(),
        state,
        description: record.description.clone(),
        target_operation_id: Some(record.target_operation_id.clone()).filter(|id| !id.is_empty()),
        created_at: record.created_at,
        updated_at: record.updated_at,
        version: record.version,
    })
}

/// Maps a list of records, failing on the first malformed one.
///
/// # Errors
///
/// See [`from_record`].
pub fn from_records(records: &[OperationRecord]) -> Result<Vec<Operation>, StoreError> {
    records.iter().map(from_record).collect()
}
