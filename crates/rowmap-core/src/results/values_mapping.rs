//! Resolved output of a result-set mapping.

use super::domain::DomainResult;
use super::selection::ResultSetMappingSqlSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lock mode requested for the rows of a table alias.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    Read,
    Optimistic,
    OptimisticForceIncrement,
    PessimisticRead,
    PessimisticWrite,
    PessimisticForceIncrement,
    UpgradeNowait,
    UpgradeSkipLocked,
}

impl LockMode {
    /// Check if this mode requests any locking.
    pub fn is_locking(&self) -> bool {
        !matches!(self, LockMode::None)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockMode::None => "none",
            LockMode::Read => "read",
            LockMode::Optimistic => "optimistic",
            LockMode::OptimisticForceIncrement => "optimistic_force_increment",
            LockMode::PessimisticRead => "pessimistic_read",
            LockMode::PessimisticWrite => "pessimistic_write",
            LockMode::PessimisticForceIncrement => "pessimistic_force_increment",
            LockMode::UpgradeNowait => "upgrade_nowait",
            LockMode::UpgradeSkipLocked => "upgrade_skip_locked",
        };
        f.write_str(name)
    }
}

/// Immutable mapping consumed by the row-reading layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JdbcValuesMapping {
    selections: Vec<Arc<ResultSetMappingSqlSelection>>,
    domain_results: Vec<DomainResult>,
    row_size: usize,
    lock_modes: BTreeMap<String, LockMode>,
}

impl JdbcValuesMapping {
    /// Create a mapping.
    pub fn new(
        selections: Vec<Arc<ResultSetMappingSqlSelection>>,
        domain_results: Vec<DomainResult>,
        row_size: usize,
        lock_modes: BTreeMap<String, LockMode>,
    ) -> Self {
        Self {
            selections,
            domain_results,
            row_size,
            lock_modes,
        }
    }

    /// Selections in registration order.
    pub fn selections(&self) -> &[Arc<ResultSetMappingSqlSelection>] {
        &self.selections
    }

    /// Top-level domain results in result order.
    pub fn domain_results(&self) -> &[DomainResult] {
        &self.domain_results
    }

    /// Number of values in one row.
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Lock modes registered per table alias.
    pub fn lock_modes(&self) -> &BTreeMap<String, LockMode> {
        &self.lock_modes
    }

    /// Lock mode registered for `alias`, or `default` when there is none.
    pub fn determine_default_lock_mode(&self, alias: &str, default: LockMode) -> LockMode {
        self.lock_modes.get(alias).copied().unwrap_or(default)
    }
}
