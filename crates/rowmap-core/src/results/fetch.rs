//! Fetch builders and the fetchable categories they apply to.

use super::values_mapping::LockMode;
use crate::catalog::{
    AnyDef, AttributeDef, AttributeKind, BasicDef, CollectionElement, EmbeddableDef, PluralDef,
    ToOneDef,
};
use std::collections::BTreeMap;

/// Explicit fetch builders of a parent, keyed by fetchable name.
pub type FetchBuilders = BTreeMap<String, FetchBuilder>;

/// Legacy fetch builders keyed by owner table alias, then fetchable name.
pub type LegacyFetchBuilders = BTreeMap<String, BTreeMap<String, LegacyFetchBuilder>>;

/// Name under which the element of a collection is fetched.
pub const ELEMENT_PART_NAME: &str = "{element}";

/// A user-supplied rule for reading one fetchable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchBuilder {
    /// Declared below an entity result builder.
    Dynamic(DynamicFetchBuilder),
    /// Declared by owner table alias (`<return-join>` style).
    Legacy(LegacyFetchBuilder),
}

/// Fetch builder nested in a result builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DynamicFetchBuilder {
    /// Result-set aliases of the fetchable's columns, in column order.
    pub column_names: Vec<String>,
    /// Table alias of a joined association.
    pub table_alias: Option<String>,
    pub lock_mode: LockMode,
    /// Builders for the fetchables of a joined or embedded target.
    pub fetch_builders: FetchBuilders,
}

/// Fetch builder registered by owner alias on the mapping itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegacyFetchBuilder {
    /// Alias of the joined table.
    pub table_alias: String,
    /// Alias of the table owning the association.
    pub owner_alias: String,
    /// Association name on the owner.
    pub fetchable_name: String,
    pub column_names: Vec<String>,
    pub lock_mode: LockMode,
    pub fetch_builders: FetchBuilders,
}

impl DynamicFetchBuilder {
    /// Builder reading a fetchable from the given columns.
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            column_names,
            ..Default::default()
        }
    }

    /// Builder joining an association through a table alias.
    pub fn joined(table_alias: impl Into<String>) -> Self {
        Self {
            table_alias: Some(table_alias.into()),
            ..Default::default()
        }
    }

    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    /// Add a builder for a fetchable of the target.
    pub fn with_fetch(mut self, name: impl Into<String>, builder: impl Into<FetchBuilder>) -> Self {
        self.fetch_builders.insert(name.into(), builder.into());
        self
    }
}

impl LegacyFetchBuilder {
    /// Builder joining `owner_alias.fetchable_name` as `table_alias`.
    pub fn new(
        table_alias: impl Into<String>,
        owner_alias: impl Into<String>,
        fetchable_name: impl Into<String>,
    ) -> Self {
        Self {
            table_alias: table_alias.into(),
            owner_alias: owner_alias.into(),
            fetchable_name: fetchable_name.into(),
            column_names: Vec::new(),
            lock_mode: LockMode::None,
            fetch_builders: FetchBuilders::new(),
        }
    }

    pub fn with_column_names(mut self, column_names: Vec<String>) -> Self {
        self.column_names = column_names;
        self
    }

    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    /// Add a builder for a fetchable of the joined target.
    pub fn with_fetch(mut self, name: impl Into<String>, builder: impl Into<FetchBuilder>) -> Self {
        self.fetch_builders.insert(name.into(), builder.into());
        self
    }
}

impl From<DynamicFetchBuilder> for FetchBuilder {
    fn from(builder: DynamicFetchBuilder) -> Self {
        FetchBuilder::Dynamic(builder)
    }
}

impl From<LegacyFetchBuilder> for FetchBuilder {
    fn from(builder: LegacyFetchBuilder) -> Self {
        FetchBuilder::Legacy(builder)
    }
}

impl FetchBuilder {
    pub fn column_names(&self) -> &[String] {
        match self {
            FetchBuilder::Dynamic(builder) => &builder.column_names,
            FetchBuilder::Legacy(builder) => &builder.column_names,
        }
    }

    pub fn table_alias(&self) -> Option<&str> {
        match self {
            FetchBuilder::Dynamic(builder) => builder.table_alias.as_deref(),
            FetchBuilder::Legacy(builder) => Some(builder.table_alias.as_str()),
        }
    }

    pub fn lock_mode(&self) -> LockMode {
        match self {
            FetchBuilder::Dynamic(builder) => builder.lock_mode,
            FetchBuilder::Legacy(builder) => builder.lock_mode,
        }
    }

    pub fn fetch_builders(&self) -> &FetchBuilders {
        match self {
            FetchBuilder::Dynamic(builder) => &builder.fetch_builders,
            FetchBuilder::Legacy(builder) => &builder.fetch_builders,
        }
    }

    /// Check if this builder, or any builder below it, joins a table.
    pub fn contains_join(&self) -> bool {
        self.table_alias().is_some() || self.fetch_builders().values().any(Self::contains_join)
    }
}

/// Runtime category of a fetchable model part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fetchable<'a> {
    Basic {
        name: &'a str,
        basic: &'a BasicDef,
    },
    Embeddable {
        name: &'a str,
        embeddable: &'a EmbeddableDef,
    },
    ToOne {
        name: &'a str,
        to_one: &'a ToOneDef,
    },
    Plural {
        name: &'a str,
        plural: &'a PluralDef,
    },
    /// Entity-valued element of a collection.
    EntityCollectionPart {
        name: &'a str,
        target: &'a str,
    },
    /// Association discriminated by a column value.
    Discriminated {
        name: &'a str,
        any: &'a AnyDef,
    },
}

impl<'a> Fetchable<'a> {
    /// Category of an attribute.
    pub fn from_attribute(attribute: &'a AttributeDef) -> Self {
        let name = attribute.name.as_str();
        match &attribute.kind {
            AttributeKind::Basic(basic) => Fetchable::Basic { name, basic },
            AttributeKind::Embedded(embeddable) => Fetchable::Embeddable { name, embeddable },
            AttributeKind::ToOne(to_one) => Fetchable::ToOne { name, to_one },
            AttributeKind::Plural(plural) => Fetchable::Plural { name, plural },
            AttributeKind::Any(any) => Fetchable::Discriminated { name, any },
        }
    }

    /// Category of a collection's element part.
    pub fn collection_element(plural: &'a PluralDef) -> Self {
        let name = ELEMENT_PART_NAME;
        match &plural.element {
            CollectionElement::Basic(basic) => Fetchable::Basic { name, basic },
            CollectionElement::Embeddable(embeddable) => Fetchable::Embeddable { name, embeddable },
            CollectionElement::Entity { target } => Fetchable::EntityCollectionPart {
                name,
                target: target.as_str(),
            },
        }
    }

    /// Name of the fetchable within its parent.
    pub fn name(&self) -> &'a str {
        match *self {
            Fetchable::Basic { name, .. }
            | Fetchable::Embeddable { name, .. }
            | Fetchable::ToOne { name, .. }
            | Fetchable::Plural { name, .. }
            | Fetchable::EntityCollectionPart { name, .. }
            | Fetchable::Discriminated { name, .. } => name,
        }
    }
}
