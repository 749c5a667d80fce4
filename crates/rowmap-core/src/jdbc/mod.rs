//! JDBC-facing types: column metadata of an executed statement and the
//! mapping from JDBC column types to value types.

mod metadata;
mod types;

pub use metadata::{ColumnDescriptor, JdbcValuesMetadata, MetadataShape, ResultSetMetadata};
pub use types::{JdbcType, TypeConfiguration};
