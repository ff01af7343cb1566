//! Query filters, result pages, and aggregate statistics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::OperationState;

/// Page size used when a filter does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Selection and pagination for operation listings.
///
/// Pages are 1-based; page `0` is treated as page `1`. An empty `states`
/// list matches every state. The creation-time bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationFilter {
    /// 1-based page number.
    pub page: u32,
    /// Maximum items per page. 0 = no limit.
    pub page_size: u32,
    /// States to include. Empty = all.
    pub states: Vec<OperationState>,
    /// Only operations created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only operations created at or before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl Default for OperationFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            states: Vec::new(),
            created_after: None,
            created_before: None,
        }
    }
}

impl OperationFilter {
    /// Restricts the listing to the given states.
    #[must_use]
    pub fn with_states(mut self, states: impl IntoIterator<Item = OperationState>) -> Self {
        self.states = states.into_iter().collect();
        self
    }

    /// Selects one page of the listing.
    #[must_use]
    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Restricts the listing to operations created within `[from, to]`.
    #[must_use]
    pub fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_after = Some(from);
        self.created_before = Some(to);
        self
    }

    /// Whether `state` passes the state restriction.
    #[must_use]
    pub fn matches_state(&self, state: OperationState) -> bool {
        self.states.is_empty() || self.states.contains(&state)
    }

    /// Whether `created_at` falls within the creation-time bounds.
    #[must_use]
    pub fn matches_created_at(&self, created_at: DateTime<Utc>) -> bool {
        self.created_after.is_none_or(|from| created_at >= from)
            && self.created_before.is_none_or(|to| created_at <= to)
    }

    /// Number of matching items that precede the selected page.
    #[must_use]
    pub fn offset(&self) -> usize {
        let page = self.page.max(1) - 1;
        page as usize * self.page_size as usize
    }

    /// Maximum number of items on the selected page.
    #[must_use]
    pub fn limit(&self) -> usize {
        if self.page_size == 0 {
            usize::MAX
        } else {
            self.page_size as usize
        }
    }
}

/// One page of a listing together with its size and the size of the
/// whole match set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPage<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Number of items on this page.
    pub count: usize,
    /// Number of items matching the filter across all pages.
    pub total_count: usize,
}

/// Operation counts per state for the two instance-lifecycle kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Provisioning operations by state.
    pub provisioning: HashMap<OperationState, usize>,
    /// Deprovisioning operations by state.
    pub deprovisioning: HashMap<OperationState, usize>,
}

/// Operation counts per state within one orchestration.
pub type OrchestrationStats = HashMap<OperationState, usize>;
