//! Selections synthesized from result-set metadata.

use crate::catalog::ScalarType;
use serde::Serialize;
use std::sync::Arc;

/// A column read from the JDBC values array.
///
/// The selection is built from already known metadata rather than from a
/// table/column pair, so it doubles as its own SQL expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResultSetMappingSqlSelection {
    values_array_position: usize,
    jdbc_type: ScalarType,
    nested: bool,
}

impl ResultSetMappingSqlSelection {
    /// Selection reading the top-level row at a 0-based position.
    pub fn new(values_array_position: usize, jdbc_type: ScalarType) -> Self {
        Self {
            values_array_position,
            jdbc_type,
            nested: false,
        }
    }

    /// Selection reading a component of an aggregate value at a 0-based index.
    pub fn nested(values_array_position: usize, jdbc_type: ScalarType) -> Self {
        Self {
            values_array_position,
            jdbc_type,
            nested: true,
        }
    }

    /// 0-based position in the values array (or within the aggregate when nested).
    pub fn values_array_position(&self) -> usize {
        self.values_array_position
    }

    /// 1-based JDBC column index.
    pub fn jdbc_result_set_index(&self) -> usize {
        self.values_array_position + 1
    }

    /// Value type extracted from the column.
    pub fn jdbc_type(&self) -> &ScalarType {
        &self.jdbc_type
    }

    /// Check if the selection reads inside an aggregate column.
    pub fn is_nested(&self) -> bool {
        self.nested
    }
}

/// Reference to a column through an optional table alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnReference {
    /// Table alias qualifying the column.
    pub table_alias: Option<String>,
    /// Column expression (result-set alias).
    pub column: String,
    /// Value type read from the column.
    pub jdbc_type: ScalarType,
}

/// Expression produced by a selection creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExpression {
    /// Already a selection; registered as is.
    Selection(Arc<ResultSetMappingSqlSelection>),
    /// Plain column reference, positioned by alias lookup.
    ColumnReference(ColumnReference),
    /// Case-expression discriminator surfaced under a result-set alias.
    CaseDiscriminator {
        /// Result-set alias of the discriminator value.
        alias: String,
        /// Value type of the discriminator.
        jdbc_type: ScalarType,
    },
}

/// What a [`ColumnReferenceKey`] selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selectable {
    /// A column alias, compared ignoring ASCII case.
    Column(String),
    /// A 1-based JDBC position.
    Position(usize),
}

/// De-duplication key for selections: a table reference plus a selectable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnReferenceKey {
    table_alias: Option<String>,
    selectable: Selectable,
}

impl ColumnReferenceKey {
    /// Key for a column alias.
    pub fn column(table_alias: Option<&str>, column: &str) -> Self {
        Self {
            table_alias: table_alias.map(str::to_string),
            selectable: Selectable::Column(column.to_ascii_lowercase()),
        }
    }

    /// Key for a 1-based JDBC position.
    pub fn position(position: usize) -> Self {
        Self {
            table_alias: None,
            selectable: Selectable::Position(position),
        }
    }

    /// The qualifying table reference.
    pub fn table_alias(&self) -> Option<&str> {
        self.table_alias.as_deref()
    }

    /// The selected column or position.
    pub fn selectable(&self) -> &Selectable {
        &self.selectable
    }
}
