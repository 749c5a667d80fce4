//! rowmap core - result-set mapping resolution for native SQL queries.
//!
//! Given a metamodel, a set of result builders and the column metadata of an
//! executed statement, this crate resolves which column feeds which scalar,
//! entity, embeddable or association in the typed result graph.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod config;
pub mod error;
pub mod jdbc;
pub mod results;
pub mod session;

pub use catalog::{
    AttributeDef, AttributeKind, EntityDef, FetchProfile, FetchTiming, ForeignKeySide,
    MappingMetamodel, ScalarType,
};
pub use config::ResultsConfig;
pub use error::{Error, Result};
pub use jdbc::{JdbcType, JdbcValuesMetadata, MetadataShape, ResultSetMetadata, TypeConfiguration};
pub use results::{
    DomainResult, Fetch, JdbcValuesMapping, LockMode, NamedResultSetMappingMemento, ResultBuilder,
    ResultSetMapping,
};
pub use session::{LoadQueryInfluencers, SessionFactory};
