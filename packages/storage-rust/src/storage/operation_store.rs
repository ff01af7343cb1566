//! Operation store: typed, retrying, optimistically locked access to
//! operations over a [`SessionFactory`].
//!
//! Every call opens a fresh session, runs the session call through the
//! store's [`RetryPolicy`], and converts records through the payload codec.
//! Transient session failures are retried until the deadline; not-found and
//! conflict outcomes end the call immediately.

use std::sync::Arc;

use chrono::Utc;
use opstore_core::{
    Operation, OperationData, OperationFilter, OperationPage, OperationState, OperationStats,
    OperationType, OrchestrationStats, TypedOperation,
};

use super::codec;
use super::mapper;
use super::record::OperationRecord;
use super::session::SessionFactory;
use crate::config::StoreConfig;
use crate::error::{SessionError, StoreError};
use crate::retry::{Outcome, RetryPolicy};

/// Maps a session result onto a retry outcome: transient failures are
/// retried, everything else ends the call.
fn classify<T>(result: Result<T, SessionError>) -> Outcome<T, StoreError> {
    match result {
        Ok(value) => Outcome::Success(value),
        Err(err) if err.is_transient() => Outcome::Retryable(err.into()),
        Err(err) => Outcome::Terminal(err.into()),
    }
}

/// Like [`classify`], for bulk reads where an empty result is legitimate
/// and a not-found report means "nothing matched".
fn classify_list<T>(result: Result<Vec<T>, SessionError>) -> Outcome<Vec<T>, StoreError> {
    match result {
        Err(err) if err.is_not_found() => Outcome::Success(Vec::new()),
        other => classify(other),
    }
}

/// Persistent store of operations of every kind.
///
/// Holds no cached state; cloning shares the session factory.
#[derive(Clone)]
pub struct OperationStore {
    sessions: Arc<dyn SessionFactory>,
    retry: RetryPolicy,
}

impl OperationStore {
    /// Creates a store over `sessions` using `retry` for every retried call.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionFactory>, retry: RetryPolicy) -> Self {
        Self { sessions, retry }
    }

    /// Creates a store with the retry policy from `config`.
    #[must_use]
    pub fn from_config(sessions: Arc<dyn SessionFactory>, config: &StoreConfig) -> Self {
        Self::new(sessions, config.retry_policy())
    }

    /// Stores a new operation.
    ///
    /// Does not check for an existing id; a collision surfaces as whatever
    /// the session reports for it.
    ///
    /// # Errors
    ///
    /// Encoding errors from [`codec::encode`], the session's terminal error,
    /// or the last transient error once the retry deadline has passed.
    pub async fn insert_operation<D: OperationData>(
        &self,
        operation: &TypedOperation<D>,
    ) -> Result<(), StoreError> {
        let record = codec::encode(operation)?;
        let session = self.sessions.write_session();
        let session = session.as_ref();
        let record = &record;

        self.retry
            .poll_until_success("insert_operation", || async move {
                classify(session.insert_operation(record.clone()).await)
            })
            .await?;

        tracing::debug!(id = %operation.id, operation_type = %D::TYPE, "operation inserted");
        Ok(())
    }

    /// Loads the operation with the given id as kind `D`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no operation has this id.
    /// - [`StoreError::TypeMismatch`] if the stored operation is not of kind `D`.
    /// - [`StoreError::Codec`] if the stored payload does not parse.
    /// - [`StoreError::Session`] if the session kept failing.
    pub async fn get_operation_by_id<D: OperationData>(
        &self,
        id: &str,
    ) -> Result<TypedOperation<D>, StoreError> {
        let record = self.fetch_by_id(id).await?;
        codec::decode(&record)
    }

    /// Loads the envelope of the operation with the given id, whatever its kind.
    ///
    /// # Errors
    ///
    /// As [`get_operation_by_id`](Self::get_operation_by_id), without the
    /// type check.
    pub async fn get_operation(&self, id: &str) -> Result<Operation, StoreError> {
        let record = self.fetch_by_id(id).await?;
        mapper::from_record(&record)
    }

    /// Loads the most recent operation of kind `D` for the instance.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the instance has no operation of this kind;
    /// otherwise as [`get_operation_by_id`](Self::get_operation_by_id).
    pub async fn get_operation_by_instance_id<D: OperationData>(
        &self,
        instance_id: &str,
    ) -> Result<TypedOperation<D>, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        let record = self
            .retry
            .poll_until_success("get_operation_by_instance_id", || async move {
                classify(
                    session
                        .get_operation_by_type_and_instance_id(instance_id, D::TYPE)
                        .await,
                )
            })
            .await?;
        codec::decode(&record)
    }

    /// Loads every operation of kind `D` for the instance, newest first.
    ///
    /// # Errors
    ///
    /// Decoding errors, or the last transient error once the retry deadline
    /// has passed. An instance without operations yields an empty list.
    pub async fn list_operations_by_instance_id<D: OperationData>(
        &self,
        instance_id: &str,
    ) -> Result<Vec<TypedOperation<D>>, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        let records = self
            .retry
            .poll_until_success("list_operations_by_instance_id", || async move {
                classify_list(
                    session
                        .get_operations_by_type_and_instance_id(instance_id, D::TYPE)
                        .await,
                )
            })
            .await?;
        codec::decode_all(&records)
    }

    /// Writes `operation` if its version is still the stored one.
    ///
    /// Stamps `updated_at`, then performs a conditional update keyed on
    /// `(id, version)`. When the session reports no match, one read by id
    /// tells a missing operation apart from a stale version. On success the
    /// returned operation carries `version + 1`, matching the stored record.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no operation has this id.
    /// - [`StoreError::Conflict`] if the presented version is stale.
    /// - [`StoreError::TypeMismatch`] if the stored operation is of another kind.
    /// - Encoding errors from [`codec::encode`].
    /// - [`StoreError::Session`] if the session kept failing.
    pub async fn update_operation<D: OperationData>(
        &self,
        mut operation: TypedOperation<D>,
    ) -> Result<TypedOperation<D>, StoreError> {
        operation.operation.updated_at = Utc::now();
        let record = codec::encode(&operation)?;
        let session = self.sessions.write_session();
        let session = session.as_ref();
        let record = &record;

        self.retry
            .poll_until_success("update_operation", || async move {
                match session.update_operation(record.clone()).await {
                    Err(err) if err.is_not_found() => self.disambiguate_update(record).await,
                    other => classify(other),
                }
            })
            .await?;

        operation.operation.version += 1;
        tracing::debug!(
            id = %operation.id,
            operation_type = %D::TYPE,
            version = operation.version,
            "operation updated"
        );
        Ok(operation)
    }

    /// Decides why a conditional update matched nothing.
    async fn disambiguate_update(&self, record: &OperationRecord) -> Outcome<(), StoreError> {
        match self.sessions.read_session().get_operation_by_id(&record.id).await {
            Ok(stored) if stored.operation_type != record.operation_type => {
                Outcome::Terminal(StoreError::TypeMismatch {
                    id: record.id.clone(),
                    expected: record.operation_type,
                    actual: stored.operation_type,
                })
            }
            Ok(stored) => {
                tracing::warn!(
                    id = %record.id,
                    presented_version = record.version,
                    stored_version = stored.version,
                    "operation update conflict"
                );
                Outcome::Terminal(StoreError::update_conflict(&record.id))
            }
            Err(err) => classify(Err(err)),
        }
    }

    /// Loads one page of an orchestration's operations as kind `D`.
    ///
    /// A filter that matches none of the orchestration's operations yields
    /// an empty page.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the orchestration has no operations at all.
    /// - [`StoreError::TypeMismatch`] if a matching operation is not of kind `D`.
    /// - [`StoreError::Session`] if the session kept failing.
    pub async fn list_operations_by_orchestration_id<D: OperationData>(
        &self,
        orchestration_id: &str,
        filter: &OperationFilter,
    ) -> Result<OperationPage<TypedOperation<D>>, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        let (records, count, total_count) = self
            .retry
            .poll_until_success("list_operations_by_orchestration_id", || async move {
                classify(
                    session
                        .list_operations_by_orchestration_id(orchestration_id, filter)
                        .await,
                )
            })
            .await?;

        Ok(OperationPage {
            items: codec::decode_all(&records)?,
            count,
            total_count,
        })
    }

    /// Loads the envelopes of every in-progress operation of the given type.
    ///
    /// # Errors
    ///
    /// Mapping errors, or the last transient error once the retry deadline
    /// has passed.
    pub async fn get_operations_in_progress_by_type(
        &self,
        operation_type: OperationType,
    ) -> Result<Vec<Operation>, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        let records = self
            .retry
            .poll_until_success("get_operations_in_progress_by_type", || async move {
                classify_list(session.get_operations_in_progress_by_type(operation_type).await)
            })
            .await?;
        mapper::from_records(&records)
    }

    /// Loads the envelopes of the operations with the given ids. Unknown
    /// ids are skipped.
    ///
    /// # Errors
    ///
    /// Mapping errors, or the last transient error once the retry deadline
    /// has passed.
    pub async fn get_operations_for_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<Operation>, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        let records = self
            .retry
            .poll_until_success("get_operations_for_ids", || async move {
                classify_list(session.get_operations_for_ids(ids).await)
            })
            .await?;
        mapper::from_records(&records)
    }

    /// Counts provisioning and deprovisioning operations by state.
    ///
    /// Single attempt, no retry. Rows of other kinds are ignored.
    ///
    /// # Errors
    ///
    /// The session's error, classified.
    pub async fn get_operation_stats(&self) -> Result<OperationStats, StoreError> {
        let entries = self.sessions.read_session().get_operation_stats().await?;

        let mut stats = OperationStats::default();
        for entry in entries {
            let counts = match entry.operation_type {
                OperationType::Provision => &mut stats.provisioning,
                OperationType::Deprovision => &mut stats.deprovisioning,
                OperationType::UpgradeKyma => continue,
            };
            if let Some(state) = parse_stat_state(&entry.state) {
                *counts.entry(state).or_default() += entry.total;
            }
        }
        Ok(stats)
    }

    /// Counts an orchestration's operations by state.
    ///
    /// Single attempt, no retry. An unknown orchestration yields empty counts.
    ///
    /// # Errors
    ///
    /// The session's error, classified.
    pub async fn get_operation_stats_for_orchestration(
        &self,
        orchestration_id: &str,
    ) -> Result<OrchestrationStats, StoreError> {
        let entries = self
            .sessions
            .read_session()
            .get_operation_stats_for_orchestration(orchestration_id)
            .await?;

        let mut stats = OrchestrationStats::new();
        for entry in entries {
            if let Some(state) = parse_stat_state(&entry.state) {
                *stats.entry(state).or_default() += entry.total;
            }
        }
        Ok(stats)
    }

    async fn fetch_by_id(&self, id: &str) -> Result<OperationRecord, StoreError> {
        let session = self.sessions.read_session();
        let session = session.as_ref();

        self.retry
            .poll_until_success("get_operation_by_id", || async move {
                classify(session.get_operation_by_id(id).await)
            })
            .await
    }
}

fn parse_stat_state(state: &str) -> Option<OperationState> {
    let parsed = state.parse().ok();
    if parsed.is_none() {
        tracing::warn!(state, "skipping statistics row with unknown state");
    }
    parsed
}
