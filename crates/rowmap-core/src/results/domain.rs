//! Typed domain result graph produced by resolution.

use super::path::NavigablePath;
use super::values_mapping::LockMode;
use crate::catalog::{ForeignKeySide, ScalarType};
use serde::Serialize;

/// A top-level result of a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainResult {
    /// A single column value.
    Basic(BasicResult),
    /// An entity instance.
    Entity(EntityResult),
    /// A value constructed from argument results.
    Instantiation(InstantiationResult),
}

/// A scalar result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicResult {
    /// 0-based values array position.
    pub position: usize,
    /// Value type.
    pub jdbc_type: ScalarType,
    /// Column alias the result was declared with.
    pub result_variable: Option<String>,
}

/// An entity result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub path: NavigablePath,
    pub entity: String,
    pub table_alias: String,
    pub identifier: Box<Fetch>,
    /// Discriminator value, for hierarchies that have one.
    pub discriminator: Option<BasicFetch>,
    pub fetches: Vec<Fetch>,
    pub lock_mode: LockMode,
}

/// A dynamic instantiation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstantiationResult {
    /// Name of the instantiated type.
    pub target: String,
    /// Constructor arguments.
    pub arguments: Vec<DomainResult>,
}

/// A node below a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fetch {
    /// Column value of a basic attribute.
    Basic(BasicFetch),
    /// Embedded value object.
    Embeddable(EmbeddableFetch),
    /// To-one association initialized from joined columns.
    EntityJoined(EntityJoinedFetch),
    /// To-one association loaded by a subsequent select.
    EntitySelect(EntityKeyFetch),
    /// To-one association left uninitialized; only its key is read.
    EntityDelayed(EntityKeyFetch),
    /// Back reference to an entity already being read higher in the chain.
    Circular(CircularFetch),
    /// Collection-valued attribute.
    Plural(PluralFetch),
    /// Association whose target entity is chosen per row.
    Discriminated(DiscriminatedFetch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFetch {
    pub path: NavigablePath,
    /// 0-based position, within the aggregate value when `nested`.
    pub position: usize,
    pub jdbc_type: ScalarType,
    pub nested: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddableFetch {
    pub path: NavigablePath,
    pub embeddable: String,
    /// Position of the aggregate column for aggregate-mapped embeddables.
    pub aggregate_position: Option<usize>,
    pub fetches: Vec<Fetch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityJoinedFetch {
    pub path: NavigablePath,
    pub entity: String,
    pub table_alias: String,
    pub identifier: Box<Fetch>,
    pub discriminator: Option<BasicFetch>,
    pub fetches: Vec<Fetch>,
    pub lock_mode: LockMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityKeyFetch {
    pub path: NavigablePath,
    pub entity: String,
    /// Positions of the key columns.
    pub key: Vec<usize>,
    pub side: ForeignKeySide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularFetch {
    pub path: NavigablePath,
    /// Path of the ancestor entity the fetch points back to.
    pub referenced_path: NavigablePath,
    pub entity: String,
    pub key: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluralFetch {
    pub path: NavigablePath,
    /// Positions of the collection key columns.
    pub key: Vec<usize>,
    /// Element read from joined columns; `None` for delayed collections.
    pub element: Option<Box<Fetch>>,
    pub table_alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscriminatedFetch {
    pub path: NavigablePath,
    pub discriminator: usize,
    pub key: usize,
}

impl DomainResult {
    /// Check if the result (or any argument of it) is more than one scalar column.
    pub fn contains_any_non_scalar_results(&self) -> bool {
        match self {
            DomainResult::Basic(_) => false,
            DomainResult::Entity(_) => true,
            DomainResult::Instantiation(instantiation) => instantiation
                .arguments
                .iter()
                .any(DomainResult::contains_any_non_scalar_results),
        }
    }

    /// Sorted, de-duplicated top-level positions read by this result.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = Vec::new();
        self.collect_positions(&mut positions);
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    fn collect_positions(&self, out: &mut Vec<usize>) {
        match self {
            DomainResult::Basic(basic) => out.push(basic.position),
            DomainResult::Entity(entity) => {
                entity.identifier.collect_positions(out);
                if let Some(discriminator) = &entity.discriminator {
                    discriminator.collect_positions(out);
                }
                for fetch in &entity.fetches {
                    fetch.collect_positions(out);
                }
            }
            DomainResult::Instantiation(instantiation) => {
                for argument in &instantiation.arguments {
                    argument.collect_positions(out);
                }
            }
        }
    }
}

impl BasicFetch {
    fn collect_positions(&self, out: &mut Vec<usize>) {
        if !self.nested {
            out.push(self.position);
        }
    }
}

impl Fetch {
    /// Path of the fetched node.
    pub fn path(&self) -> &NavigablePath {
        match self {
            Fetch::Basic(fetch) => &fetch.path,
            Fetch::Embeddable(fetch) => &fetch.path,
            Fetch::EntityJoined(fetch) => &fetch.path,
            Fetch::EntitySelect(fetch) | Fetch::EntityDelayed(fetch) => &fetch.path,
            Fetch::Circular(fetch) => &fetch.path,
            Fetch::Plural(fetch) => &fetch.path,
            Fetch::Discriminated(fetch) => &fetch.path,
        }
    }

    /// Sorted, de-duplicated top-level positions read by this fetch.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = Vec::new();
        self.collect_positions(&mut positions);
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    fn collect_positions(&self, out: &mut Vec<usize>) {
        match self {
            Fetch::Basic(fetch) => fetch.collect_positions(out),
            Fetch::Embeddable(fetch) => {
                out.extend(fetch.aggregate_position);
                for child in &fetch.fetches {
                    child.collect_positions(out);
                }
            }
            Fetch::EntityJoined(fetch) => {
                fetch.identifier.collect_positions(out);
                if let Some(discriminator) = &fetch.discriminator {
                    discriminator.collect_positions(out);
                }
                for child in &fetch.fetches {
                    child.collect_positions(out);
                }
            }
            Fetch::EntitySelect(fetch) | Fetch::EntityDelayed(fetch) => {
                out.extend(fetch.key.iter().copied())
            }
            Fetch::Circular(fetch) => out.extend(fetch.key.iter().copied()),
            Fetch::Plural(fetch) => {
                out.extend(fetch.key.iter().copied());
                if let Some(element) = &fetch.element {
                    element.collect_positions(out);
                }
            }
            Fetch::Discriminated(fetch) => {
                out.push(fetch.discriminator);
                out.push(fetch.key);
            }
        }
    }
}
