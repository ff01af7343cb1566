//! Type and state tags shared by every operation kind.
//!
//! Both tags are stored as plain strings in the physical record, so each
//! enum carries its storage name via [`as_str`](OperationType::as_str) and
//! parses back with [`FromStr`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseTagError {
    /// Which tag family failed to parse (`"operation type"` or `"operation state"`).
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

/// Discriminant selecting which payload an operation carries.
///
/// Immutable after insert: a record is always read back through the
/// accessor for the type it was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Creation of a runtime for an instance.
    #[serde(rename = "provision")]
    Provision,
    /// Removal of an instance's runtime.
    #[serde(rename = "deprovision")]
    Deprovision,
    /// Kyma upgrade executed as part of an orchestration.
    #[serde(rename = "upgradeKyma")]
    UpgradeKyma,
}

impl OperationType {
    /// All known operation types, in declaration order.
    pub const ALL: [OperationType; 3] = [
        OperationType::Provision,
        OperationType::Deprovision,
        OperationType::UpgradeKyma,
    ];

    /// Storage name of this type tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Deprovision => "deprovision",
            Self::UpgradeKyma => "upgradeKyma",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseTagError {
                kind: "operation type",
                value: s.to_string(),
            })
    }
}

/// Status of an operation.
///
/// The store records whatever state the caller sets; legal transitions are
/// the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    /// Accepted but not yet started.
    #[serde(rename = "pending")]
    Pending,
    /// Currently being processed.
    #[serde(rename = "in progress")]
    InProgress,
    /// Finished successfully.
    #[serde(rename = "succeeded")]
    Succeeded,
    /// Finished with an error.
    #[serde(rename = "failed")]
    Failed,
    /// Stopped before completion (orchestrations only).
    #[serde(rename = "canceled")]
    Canceled,
}

impl OperationState {
    /// All known states, in declaration order.
    pub const ALL: [OperationState; 5] = [
        OperationState::Pending,
        OperationState::InProgress,
        OperationState::Succeeded,
        OperationState::Failed,
        OperationState::Canceled,
    ];

    /// Storage name of this state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationState {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseTagError {
                kind: "operation state",
                value: s.to_string(),
            })
    }
}
