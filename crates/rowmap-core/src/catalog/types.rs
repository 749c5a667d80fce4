//! Core type definitions for the catalog.

use serde::{Deserialize, Serialize};

/// Value types an attribute or an auto-discovered column can carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
    /// Anything the type configuration cannot narrow down.
    Object,
}

/// When an association is initialized relative to the owning row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTiming {
    /// Initialized as part of loading the owner.
    Immediate,
    /// Left uninitialized until first access.
    #[default]
    Delayed,
}

/// Which side of a to-one association holds the foreign key columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeySide {
    /// The owner's table holds the foreign key.
    #[default]
    Referring,
    /// The target's table holds the key; the owner side reads its own identifier.
    Target,
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::Float32
                | ScalarType::Float64
                | ScalarType::Decimal { .. }
        )
    }

    /// Short display name used by formatters and log fields.
    pub fn name(&self) -> String {
        match self {
            ScalarType::Bool => "bool".into(),
            ScalarType::Int16 => "int16".into(),
            ScalarType::Int32 => "int32".into(),
            ScalarType::Int64 => "int64".into(),
            ScalarType::Float32 => "float32".into(),
            ScalarType::Float64 => "float64".into(),
            ScalarType::Decimal { precision, scale } => format!("decimal({precision},{scale})"),
            ScalarType::String => "string".into(),
            ScalarType::Bytes => "bytes".into(),
            ScalarType::Date => "date".into(),
            ScalarType::Time => "time".into(),
            ScalarType::Timestamp => "timestamp".into(),
            ScalarType::Uuid => "uuid".into(),
            ScalarType::Object => "object".into(),
        }
    }
}
