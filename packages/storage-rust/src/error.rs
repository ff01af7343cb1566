//! Error taxonomy for the session contract and the operation store.
//!
//! Sessions classify their failures with [`SessionErrorKind`]; the store
//! turns those into exactly one [`StoreError`] per public call. Callers
//! branch on [`StoreError::kind`] rather than inspecting messages.

use opstore_core::OperationType;

/// Classification of a failure reported by a storage session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// No record matched the request. For conditional updates this also
    /// covers a stale version.
    NotFound,
    /// The write collided with existing data (e.g. duplicate id).
    Conflict,
    /// Anything else: connectivity, timeouts, lock contention.
    Transient,
}

/// Failure reported by a storage session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SessionError {
    /// How the store should treat this failure.
    pub kind: SessionErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl SessionError {
    /// A "no matching record" failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::NotFound,
            message: message.into(),
        }
    }

    /// A write collision.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Conflict,
            message: message.into(),
        }
    }

    /// A failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Transient,
            message: message.into(),
        }
    }

    /// Whether this failure reports a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == SessionErrorKind::NotFound
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == SessionErrorKind::Transient
    }
}

/// Machine-checkable classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested id, instance, or orchestration has no record.
    NotFound,
    /// The presented version is stale, or the write collided.
    Conflict,
    /// The stored type tag differs from the one the accessor expects.
    TypeMismatch,
    /// A payload or stored field could not be encoded or decoded.
    Codec,
    /// The operation violates an envelope invariant and was not written.
    InvalidOperation,
    /// The session kept failing until the retry deadline passed.
    Transient,
}

/// Errors returned by [`OperationStore`](crate::storage::OperationStore).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("operation {id}: expected operation type {expected}, but was {actual}")]
    TypeMismatch {
        id: String,
        expected: OperationType,
        actual: OperationType,
    },
    #[error("operation {id}: {reason}")]
    Codec { id: String, reason: String },
    #[error("invalid operation {id}: {reason}")]
    InvalidOperation { id: String, reason: String },
    #[error("storage session failed: {0}")]
    Session(#[source] SessionError),
}

impl StoreError {
    /// Builds a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// The optimistic-lock failure reported for a stale update of `id`.
    #[must_use]
    pub fn update_conflict(id: &str) -> Self {
        Self::Conflict {
            message: format!("operation update conflict, operation ID: {id}"),
        }
    }

    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Codec { .. } => ErrorKind::Codec,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::Session(_) => ErrorKind::Transient,
        }
    }

    /// Whether this error reports a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether this error reports an optimistic-lock failure or write collision.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<SessionError> for StoreError {
    fn from(err: SessionError) -> Self {
        match err.kind {
            SessionErrorKind::NotFound => Self::NotFound {
                message: err.message,
            },
            SessionErrorKind::Conflict => Self::Conflict {
                message: err.message,
            },
            SessionErrorKind::Transient => Self::Session(err),
        }
    }
}
