//! In-memory [`SessionFactory`] backed by [`DashMap`].
//!
//! Implements the full session contract against a process-local map, so it
//! can stand in for a database in tests and single-process deployments.
//! Fault injection makes sessions report transient failures on demand.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use opstore_core::{OperationFilter, OperationState, OperationType};

use crate::error::{SessionError, SessionErrorKind};
use crate::storage::record::{OperationRecord, OperationStatEntry, OrchestrationStatEntry};
use crate::storage::session::{ReadSession, SessionFactory, WriteSession};

/// Injects failures into session calls.
#[derive(Debug, Default)]
struct FaultInjector {
    pending: AtomicU32,
    always: AtomicBool,
    calls: AtomicU64,
    /// Per-call-name failures: kind to report and how many calls remain.
    targeted: DashMap<&'static str, (SessionErrorKind, u32)>,
}

impl FaultInjector {
    /// Counts the call and decides whether it fails.
    fn check(&self, call: &'static str) -> Result<(), SessionError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.always.load(Ordering::Relaxed) {
            return Err(SessionError::transient(format!("{call}: storage unavailable")));
        }
        let consumed = self
            .pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(SessionError::transient(format!("{call}: connection reset")));
        }
        if let Some(mut target) = self.targeted.get_mut(call) {
            let (kind, remaining) = *target;
            if remaining > 0 {
                *target = (kind, remaining - 1);
                return Err(SessionError {
                    kind,
                    message: format!("{call}: injected failure"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryBackend {
    records: DashMap<String, OperationRecord>,
    faults: FaultInjector,
}

/// Session factory whose sessions all share one in-memory table.
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionFactory {
    backend: Arc<MemoryBackend>,
}

impl MemorySessionFactory {
    /// Creates a factory over an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` session calls fail with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.backend.faults.pending.store(count, Ordering::Relaxed);
    }

    /// Makes the next `count` calls of the session method named `call` fail
    /// with `kind`. Calls of other methods are unaffected.
    pub fn fail_call(&self, call: &'static str, kind: SessionErrorKind, count: u32) {
        self.backend.faults.targeted.insert(call, (kind, count));
    }

    /// Makes every session call fail with a transient error while `enabled`.
    pub fn fail_always(&self, enabled: bool) {
        self.backend.faults.always.store(enabled, Ordering::Relaxed);
    }

    /// Number of session calls made so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.backend.faults.calls.load(Ordering::Relaxed)
    }

    /// Number of stored operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.records.len()
    }

    /// Whether no operation is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.records.is_empty()
    }

    fn session(&self) -> MemorySession {
        MemorySession {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl SessionFactory for MemorySessionFactory {
    fn read_session(&self) -> Box<dyn ReadSession> {
        Box::new(self.session())
    }

    fn write_session(&self) -> Box<dyn WriteSession> {
        Box::new(self.session())
    }
}

/// A session over the shared table. Holds no state of its own.
struct MemorySession {
    backend: Arc<MemoryBackend>,
}

impl MemorySession {
    fn collect(&self, predicate: impl Fn(&OperationRecord) -> bool) -> Vec<OperationRecord> {
        self.backend
            .records
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn by_type_and_instance(
        &self,
        instance_id: &str,
        operation_type: OperationType,
    ) -> Vec<OperationRecord> {
        let mut records = self.collect(|r| {
            r.instance_id == instance_id && r.operation_type == operation_type
        });
        records.sort_by_key(|r| Reverse(r.created_at));
        records
    }
}

fn matches_filter(record: &OperationRecord, filter: &OperationFilter) -> bool {
    let state_ok = filter.states.is_empty()
        || record
            .state
            .parse::<OperationState>()
            .is_ok_and(|state| filter.matches_state(state));
    state_ok && filter.matches_created_at(record.created_at)
}

#[async_trait]
impl ReadSession for MemorySession {
    async fn get_operation_by_id(&self, id: &str) -> Result<OperationRecord, SessionError> {
        self.backend.faults.check("get_operation_by_id")?;
        self.backend
            .records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SessionError::not_found(format!("operation with id {id} not exist")))
    }

    async fn get_operation_by_type_and_instance_id(
        &self,
        instance_id: &str,
        operation_type: OperationType,
    ) -> Result<OperationRecord, SessionError> {
        self.backend
            .faults
            .check("get_operation_by_type_and_instance_id")?;
        self.by_type_and_instance(instance_id, operation_type)
            .into_iter()
            .next()
            .ok_or_else(|| {
                SessionError::not_found(format!(
                    "{operation_type} operation for instance {instance_id} not exist"
                ))
            })
    }

    async fn get_operations_by_type_and_instance_id(
        &self,
        instance_id: &str,
        operation_type: OperationType,
    ) -> Result<Vec<OperationRecord>, SessionError> {
        self.backend
            .faults
            .check("get_operations_by_type_and_instance_id")?;
        Ok(self.by_type_and_instance(instance_id, operation_type))
    }

    async fn get_operations_in_progress_by_type(
        &self,
        operation_type: OperationType,
    ) -> Result<Vec<OperationRecord>, SessionError> {
        self.backend
            .faults
            .check("get_operations_in_progress_by_type")?;
        let in_progress = OperationState::InProgress.as_str();
        let mut records =
            self.collect(|r| r.operation_type == operation_type && r.state == in_progress);
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn get_operations_for_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<OperationRecord>, SessionError> {
        self.backend.faults.check("get_operations_for_ids")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.backend.records.get(id).map(|e| e.value().clone()))
            .collect())
    }

    async fn list_operations_by_orchestration_id(
        &self,
        orchestration_id: &str,
        filter: &OperationFilter,
    ) -> Result<(Vec<OperationRecord>, usize, usize), SessionError> {
        self.backend
            .faults
            .check("list_operations_by_orchestration_id")?;
        let all = self.collect(|r| r.orchestration_id.as_deref() == Some(orchestration_id));
        if all.is_empty() {
            return Err(SessionError::not_found(format!(
                "operations for orchestration ID {orchestration_id} not exist"
            )));
        }

        let mut matched: Vec<OperationRecord> =
            all.into_iter().filter(|r| matches_filter(r, filter)).collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let total_count = matched.len();
        let page: Vec<OperationRecord> = matched
            .into_iter()
            .skip(filter.offset())
            .take(filter.limit())
            .collect();
        let count = page.len();
        Ok((page, count, total_count))
    }

    async fn get_operation_stats(&self) -> Result<Vec<OperationStatEntry>, SessionError> {
        self.backend.faults.check("get_operation_stats")?;
        let mut totals: HashMap<(OperationType, String), usize> = HashMap::new();
        for entry in self.backend.records.iter() {
            let record = entry.value();
            *totals
                .entry((record.operation_type, record.state.clone()))
                .or_default() += 1;
        }
        let mut entries: Vec<OperationStatEntry> = totals
            .into_iter()
            .map(|((operation_type, state), total)| OperationStatEntry {
                operation_type,
                state,
                total,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.operation_type
                .as_str()
                .cmp(b.operation_type.as_str())
                .then_with(|| a.state.cmp(&b.state))
        });
        Ok(entries)
    }

    async fn get_operation_stats_for_orchestration(
        &self,
        orchestration_id: &str,
    ) -> Result<Vec<OrchestrationStatEntry>, SessionError> {
        self.backend
            .faults
            .check("get_operation_stats_for_orchestration")?;
        let mut totals: HashMap<String, usize> = HashMap::new();
        for record in self.collect(|r| r.orchestration_id.as_deref() == Some(orchestration_id)) {
            *totals.entry(record.state).or_default() += 1;
        }
        let mut entries: Vec<OrchestrationStatEntry> = totals
            .into_iter()
            .map(|(state, total)| OrchestrationStatEntry { state, total })
            .collect();
        entries.sort_by(|a, b| a.state.cmp(&b.state));
        Ok(entries)
    }
}

#[async_trait]
impl WriteSession for MemorySession {
    async fn insert_operation(&self, record: OperationRecord) -> Result<(), SessionError> {
        self.backend.faults.check("insert_operation")?;
        match self.backend.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(SessionError::conflict(format!(
                "operation with id {} already exist",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn update_operation(&self, record: OperationRecord) -> Result<(), SessionError> {
        self.backend.faults.check("update_operation")?;
        let not_found = || {
            SessionError::not_found(format!(
                "operation with id {} and version {} not exist",
                record.id, record.version
            ))
        };
        let mut stored = self.backend.records.get_mut(&record.id).ok_or_else(&not_found)?;
        if stored.version != record.version || stored.operation_type != record.operation_type {
            return Err(not_found());
        }

        // Identity columns are fixed at insert.
        stored.orchestration_id.clone_from(&record.orchestration_id);
        stored.state.clone_from(&record.state);
        stored.description.clone_from(&record.description);
        stored.target_operation_id.clone_from(&record.target_operation_id);
        stored.data.clone_from(&record.data);
        stored.updated_at = record.updated_at;
        stored.version = record.version + 1;
        Ok(())
    }
}
