//! JDBC column types and their resolution to domain value types.

use crate::catalog::ScalarType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column type as reported by result-set metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JdbcType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric { precision: u8, scale: u8 },
    Decimal { precision: u8, scale: u8 },
    Char,
    Varchar,
    LongVarchar,
    Binary,
    VarBinary,
    Blob,
    Clob,
    Date,
    Time,
    Timestamp,
    Uuid,
    Other,
}

impl JdbcType {
    /// The `java.sql.Types`-compatible type code.
    pub fn code(&self) -> i32 {
        match self {
            JdbcType::Bit => -7,
            JdbcType::Boolean => 16,
            JdbcType::TinyInt => -6,
            JdbcType::SmallInt => 5,
            JdbcType::Integer => 4,
            JdbcType::BigInt => -5,
            JdbcType::Real => 7,
            JdbcType::Float => 6,
            JdbcType::Double => 8,
            JdbcType::Numeric { .. } => 2,
            JdbcType::Decimal { .. } => 3,
            JdbcType::Char => 1,
            JdbcType::Varchar => 12,
            JdbcType::LongVarchar => -1,
            JdbcType::Binary => -2,
            JdbcType::VarBinary => -3,
            JdbcType::Blob => 2004,
            JdbcType::Clob => 2005,
            JdbcType::Date => 91,
            JdbcType::Time => 92,
            JdbcType::Timestamp => 93,
            JdbcType::Uuid => 3000,
            JdbcType::Other => 1111,
        }
    }
}

/// Resolves JDBC column types to domain value types for auto-discovered columns.
///
/// Registrations override the built-in table, which lets a dialect map e.g.
/// `Other` columns to `Uuid`.
#[derive(Debug, Clone, Default)]
pub struct TypeConfiguration {
    overrides: HashMap<JdbcType, ScalarType>,
}

impl TypeConfiguration {
    /// Create a configuration with the built-in mappings only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override for one JDBC type.
    pub fn with_override(mut self, jdbc_type: JdbcType, scalar: ScalarType) -> Self {
        self.overrides.insert(jdbc_type, scalar);
        self
    }

    /// Resolve the domain type for a JDBC column type.
    pub fn resolve(&self, jdbc_type: JdbcType) -> ScalarType {
        if let Some(scalar) = self.overrides.get(&jdbc_type) {
            return scalar.clone();
        }
        match jdbc_type {
            JdbcType::Bit | JdbcType::Boolean => ScalarType::Bool,
            JdbcType::TinyInt | JdbcType::SmallInt => ScalarType::Int16,
            JdbcType::Integer => ScalarType::Int32,
            JdbcType::BigInt => ScalarType::Int64,
            JdbcType::Real => ScalarType::Float32,
            JdbcType::Float | JdbcType::Double => ScalarType::Float64,
            JdbcType::Numeric { precision, scale } | JdbcType::Decimal { precision, scale } => {
                ScalarType::Decimal { precision, scale }
            }
            JdbcType::Char | JdbcType::Varchar | JdbcType::LongVarchar | JdbcType::Clob => {
                ScalarType::String
            }
            JdbcType::Binary | JdbcType::VarBinary | JdbcType::Blob => ScalarType::Bytes,
            JdbcType::Date => ScalarType::Date,
            JdbcType::Time => ScalarType::Time,
            JdbcType::Timestamp => ScalarType::Timestamp,
            JdbcType::Uuid => ScalarType::Uuid,
            JdbcType::Other => ScalarType::Object,
        }
    }
}
