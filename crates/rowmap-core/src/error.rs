//! Core error types.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while defining or resolving result-set mappings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Two columns used by the mapping share an alias the engine cannot tell apart.
    #[error(
        "encountered a duplicated sql alias [{alias}] during auto-discovery of a native-sql query"
    )]
    NonUniqueDiscoveredSqlAlias {
        /// The duplicated column alias as reported by the result set.
        alias: String,
    },

    /// The named entity is not part of the metamodel.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// The named attribute does not exist on the entity.
    #[error("unknown attribute [{attribute}] on entity [{entity}]")]
    UnknownAttribute {
        /// Entity that was searched.
        entity: String,
        /// Attribute name or path that was requested.
        attribute: String,
    },

    /// A mapping definition argument was rejected.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The requested operation is not supported.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// No result-set column carries the given alias.
    #[error("column [{0}] not found in result set")]
    ColumnNotFound(String),

    /// A 1-based JDBC position outside the result set.
    #[error("column position {position} out of range (column count {column_count})")]
    ColumnPositionOutOfRange {
        /// Requested 1-based position.
        position: usize,
        /// Number of columns in the result set.
        column_count: usize,
    },

    /// Two explicit result builders target the same JDBC position.
    #[error("a result builder is already registered for JDBC position {0}")]
    DuplicateResultPosition(usize),

    /// A scalar result without a column alias was declared after a non-scalar result.
    #[error(
        "result at position {result_position} has no column alias and positional selections are no longer allowed"
    )]
    PositionalSelectionDisallowed {
        /// 0-based position of the offending result.
        result_position: usize,
    },

    /// A joined fetch chain grew past the configured depth.
    #[error("fetch depth {depth} at [{path}] exceeds maximum allowed depth {max_depth}")]
    FetchDepthExceeded {
        /// Navigable path of the fetch that crossed the limit.
        path: String,
        /// Depth reached.
        depth: usize,
        /// Configured maximum.
        max_depth: usize,
    },

    /// A column resolved inside a nesting fetch parent is not one of its selectables.
    #[error("selectable [{column}] is not part of nesting fetch parent [{parent}]")]
    NestedSelectableNotFound {
        /// Column expression that was looked up.
        column: String,
        /// Embeddable acting as nesting parent.
        parent: String,
    },
}
