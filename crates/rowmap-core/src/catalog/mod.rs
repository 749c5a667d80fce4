//! Mapping metamodel for rowmap.
//!
//! The catalog describes entities, their attributes and associations. Result
//! builders consult it read-only while resolving a result-set mapping.

mod attribute;
mod entity;
mod metamodel;
mod types;

pub use attribute::{
    AnyDef, AttributeDef, AttributeKind, BasicDef, CollectionElement, EmbeddableDef, PluralDef,
    ToOneDef,
};
pub use entity::{DiscriminatorDef, EntityDef};
pub use metamodel::{FetchProfile, MappingMetamodel};
pub use types::{FetchTiming, ForeignKeySide, ScalarType};
