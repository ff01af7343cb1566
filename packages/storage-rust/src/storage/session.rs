//! Read/write session contract the operation store runs on.
//!
//! The store never talks to a database directly. It asks a
//! [`SessionFactory`] for a short-lived [`ReadSession`] or [`WriteSession`]
//! per call and classifies whatever [`SessionError`] comes back. Schema,
//! transport, pooling, and migrations are the implementation's business.

use async_trait::async_trait;
use opstore_core::{OperationFilter, OperationType};

use super::record::{OperationRecord, OperationStatEntry, OrchestrationStatEntry};
use crate::error::SessionError;

/// Source of per-call session handles.
///
/// Used as `Arc<dyn SessionFactory>`.
pub trait SessionFactory: Send + Sync {
    /// Opens a session for queries.
    fn read_session(&self) -> Box<dyn ReadSession>;

    /// Opens a session for inserts and updates.
    fn write_session(&self) -> Box<dyn WriteSession>;
}

/// Query side of the session contract.
///
/// Single-record lookups report a missing record as
/// [`SessionErrorKind::NotFound`](crate::error::SessionErrorKind::NotFound).
/// Bulk lookups return an empty list instead.
#[async_trait]
pub trait ReadSession: Send + Sync {
    /// Loads the operation with the given id.
    async fn get_operation_by_id(&self, id: &str) -> Result<OperationRecord, SessionError>;

    /// Loads the most recently created operation of `operation_type` for
    /// the instance.
    async fn get_operation_by_type_and_instance_id(
        &self,
        instance_id: &str,
        operation_type: OperationType,
    ) -> Result<OperationRecord, SessionError>;

    /// Loads every operation of `operation_type` for the instance, newest
    /// first.
    async fn get_operations_by_type_and_instance_id(
        &self,
        instance_id: &str,
        operation_type: OperationType,
    ) -> Result<Vec<OperationRecord>, SessionError>;

    /// Loads every operation of `operation_type` in the `in progress` state.
    async fn get_operations_in_progress_by_type(
        &self,
        operation_type: OperationType,
    ) -> Result<Vec<OperationRecord>, SessionError>;

    /// Loads the operations with the given ids. Unknown ids are skipped.
    async fn get_operations_for_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<OperationRecord>, SessionError>;

    /// Loads one page of an orchestration's operations.
    ///
    /// Returns `(page, page_count, total_count)`. Reports `NotFound` only
    /// when the orchestration has no operations at all; a filter that
    /// matches none of them yields an empty page.
    async fn list_operations_by_orchestration_id(
        &self,
        orchestration_id: &str,
        filter: &OperationFilter,
    ) -> Result<(Vec<OperationRecord>, usize, usize), SessionError>;

    /// Counts operations grouped by type and state.
    async fn get_operation_stats(&self) -> Result<Vec<OperationStatEntry>, SessionError>;

    /// Counts an orchestration's operations grouped by state.
    async fn get_operation_stats_for_orchestration(
        &self,
        orchestration_id: &str,
    ) -> Result<Vec<OrchestrationStatEntry>, SessionError>;
}

/// Mutation side of the session contract.
#[async_trait]
pub trait WriteSession: Send + Sync {
    /// Stores a new record. A duplicate id is reported as
    /// [`SessionErrorKind::Conflict`](crate::error::SessionErrorKind::Conflict).
    async fn insert_operation(&self, record: OperationRecord) -> Result<(), SessionError>;

    /// Replaces the stored record with the same id and type if its stored
    /// version equals `record.version`, storing `record.version + 1`.
    /// Identity columns (type, instance, creation time) keep their inserted
    /// values.
    ///
    /// An unknown id, a different type, and a stale version are all reported as
    /// [`SessionErrorKind::NotFound`](crate::error::SessionErrorKind::NotFound).
    async fn update_operation(&self, record: OperationRecord) -> Result<(), SessionError>;
}
