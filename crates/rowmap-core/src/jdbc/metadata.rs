//! Result-set metadata as seen by the mapping resolver.

use super::types::{JdbcType, TypeConfiguration};
use crate::catalog::ScalarType;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column metadata of an executed statement.
///
/// All positions are 1-based, following the JDBC convention.
pub trait JdbcValuesMetadata {
    /// Number of columns in the result set.
    fn column_count(&self) -> usize;

    /// Column label at a 1-based position.
    fn column_name(&self, position: usize) -> Result<&str>;

    /// Column type at a 1-based position.
    fn column_type(&self, position: usize) -> Result<JdbcType>;

    /// 1-based position of the first column whose label matches `alias`,
    /// ignoring ASCII case.
    fn resolve_column_position(&self, alias: &str) -> Result<usize> {
        for position in 1..=self.column_count() {
            if self.column_name(position)?.eq_ignore_ascii_case(alias) {
                return Ok(position);
            }
        }
        Err(Error::ColumnNotFound(alias.to_string()))
    }

    /// Domain type read from the column at `position`; an explicit type wins.
    fn resolve_type(
        &self,
        position: usize,
        explicit: Option<&ScalarType>,
        types: &TypeConfiguration,
    ) -> Result<ScalarType> {
        let jdbc_type = self.column_type(position)?;
        Ok(match explicit {
            Some(scalar) => scalar.clone(),
            None => types.resolve(jdbc_type),
        })
    }
}

/// One column of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column label.
    pub name: String,
    /// Column type.
    pub jdbc_type: JdbcType,
}

impl ColumnDescriptor {
    /// Create a column descriptor.
    pub fn new(name: impl Into<String>, jdbc_type: JdbcType) -> Self {
        Self {
            name: name.into(),
            jdbc_type,
        }
    }
}

/// In-memory result-set metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSetMetadata {
    columns: Vec<ColumnDescriptor>,
}

impl ResultSetMetadata {
    /// Create metadata from column descriptors.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Append a column.
    pub fn with_column(mut self, name: impl Into<String>, jdbc_type: JdbcType) -> Self {
        self.columns.push(ColumnDescriptor::new(name, jdbc_type));
        self
    }

    /// All columns in order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn column(&self, position: usize) -> Result<&ColumnDescriptor> {
        position
            .checked_sub(1)
            .and_then(|index| self.columns.get(index))
            .ok_or(Error::ColumnPositionOutOfRange {
                position,
                column_count: self.columns.len(),
            })
    }
}

impl JdbcValuesMetadata for ResultSetMetadata {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, position: usize) -> Result<&str> {
        Ok(self.column(position)?.name.as_str())
    }

    fn column_type(&self, position: usize) -> Result<JdbcType> {
        Ok(self.column(position)?.jdbc_type)
    }
}

/// Fingerprint of a result-set shape: column labels and types in order.
///
/// Two executions with the same shape resolve a mapping identically.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataShape {
    hash: [u8; 32],
}

impl MetadataShape {
    /// Compute the shape of a result set.
    pub fn of(metadata: &dyn JdbcValuesMetadata) -> Result<Self> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(metadata.column_count() as u64).to_le_bytes());
        for position in 1..=metadata.column_count() {
            let name = metadata.column_name(position)?;
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            let jdbc_type = metadata.column_type(position)?;
            hasher.update(&jdbc_type.code().to_le_bytes());
            if let JdbcType::Numeric { precision, scale } | JdbcType::Decimal { precision, scale } =
                jdbc_type
            {
                hasher.update(&[precision, scale]);
            }
        }
        Ok(Self {
            hash: *hasher.finalize().as_bytes(),
        })
    }

    /// Hex encoding of the fingerprint.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Debug for MetadataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataShape({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for MetadataShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
