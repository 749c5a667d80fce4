//! Result-set mapping resolution.
//!
//! A [`ResultSetMapping`] holds result and fetch builders. Resolving it
//! against the metadata of an executed statement walks the builders with one
//! [`DomainResultCreationState`], registering a selection per consumed column
//! and producing the typed [`DomainResult`] graph, packaged as an immutable
//! [`JdbcValuesMapping`].

pub mod builders;
pub mod cache;
pub mod creation_state;
pub mod domain;
pub mod fetch;
pub mod from_clause;
pub mod implicit;
pub mod mapping;
pub mod path;
pub mod selection;
pub mod values_mapping;

pub use builders::{
    attribute_result, entity, fetch, instantiation, joined_fetch, legacy_fetch, scalar, scalar_at,
    AttributeResultBuilder, EntityResultBuilder, InstantiationResultBuilder, ResultBuilder,
    ScalarResultBuilder,
};
pub use cache::{MappingCacheKey, MappingCacheStats, ResolvedMappingCache};
pub use creation_state::{DomainResultCreationState, FetchContainer, FetchParent, NestingFetchParent};
pub use domain::{
    BasicFetch, BasicResult, CircularFetch, DiscriminatedFetch, DomainResult, EmbeddableFetch,
    EntityJoinedFetch, EntityKeyFetch, EntityResult, Fetch, InstantiationResult, PluralFetch,
};
pub use fetch::{
    DynamicFetchBuilder, FetchBuilder, FetchBuilders, Fetchable, LegacyFetchBuilder,
    LegacyFetchBuilders,
};
pub use from_clause::{FromClauseAccess, TableGroup};
pub use implicit::{implicit_fetch_builder, ImplicitFetchBuilder};
pub use mapping::{NamedResultSetMappingMemento, ResultSetMapping};
pub use path::NavigablePath;
pub use selection::{ColumnReference, ColumnReferenceKey, ResultSetMappingSqlSelection, Selectable, SqlExpression};
pub use values_mapping::{JdbcValuesMapping, LockMode};
