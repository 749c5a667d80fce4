//! Attribute definitions for entities and embeddables.

use super::types::{FetchTiming, ForeignKeySide, ScalarType};
use serde::{Deserialize, Serialize};

/// An attribute definition within an entity or embeddable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: String,
    /// What the attribute maps to.
    pub kind: AttributeKind,
    /// Whether the attribute is read from the result set at all.
    #[serde(default = "default_selectable")]
    pub selectable: bool,
}

fn default_selectable() -> bool {
    true
}

/// Mapping category of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Single column value.
    Basic(BasicDef),
    /// Embedded value object.
    Embedded(EmbeddableDef),
    /// Many-to-one or one-to-one association.
    ToOne(ToOneDef),
    /// Collection-valued attribute.
    Plural(PluralDef),
    /// Association whose target entity is chosen by a discriminator column.
    Any(AnyDef),
}

/// A column-backed basic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicDef {
    /// Column name (result-set alias).
    pub column: String,
    /// Value type.
    pub scalar: ScalarType,
}

/// An embeddable value type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddableDef {
    /// Embeddable type name.
    pub name: String,
    /// Component attributes in declaration order.
    pub attributes: Vec<AttributeDef>,
    /// Column holding the whole embeddable as one aggregate (struct/json) value.
    #[serde(default)]
    pub aggregate_column: Option<String>,
}

/// A to-one association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToOneDef {
    /// Target entity name.
    pub target: String,
    /// Foreign key columns on the referring side.
    #[serde(default)]
    pub fk_columns: Vec<String>,
    /// Default fetch timing.
    #[serde(default)]
    pub fetch: FetchTiming,
    /// Side holding the foreign key.
    #[serde(default)]
    pub side: ForeignKeySide,
}

/// A collection-valued attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluralDef {
    /// Collection element.
    pub element: CollectionElement,
    /// Columns of the collection key; empty means the owner's identifier columns.
    #[serde(default)]
    pub key_columns: Vec<String>,
    /// Default fetch timing.
    #[serde(default)]
    pub fetch: FetchTiming,
}

/// Element part of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionElement {
    /// Basic-valued elements.
    Basic(BasicDef),
    /// Embeddable elements.
    Embeddable(EmbeddableDef),
    /// Entity elements.
    Entity {
        /// Element entity name.
        target: String,
    },
}

/// A discriminated ("any") association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyDef {
    /// Column holding the target discriminator value.
    pub discriminator_column: String,
    /// Column holding the target key.
    pub key_column: String,
    /// Type of the key column.
    pub key_type: ScalarType,
    /// Discriminator value to entity name mappings.
    #[serde(default)]
    pub targets: Vec<(String, String)>,
}

impl AttributeDef {
    /// Create a basic attribute.
    pub fn basic(name: impl Into<String>, column: impl Into<String>, scalar: ScalarType) -> Self {
        Self::new(
            name,
            AttributeKind::Basic(BasicDef {
                column: column.into(),
                scalar,
            }),
        )
    }

    /// Create an embedded attribute.
    pub fn embedded(name: impl Into<String>, embeddable: EmbeddableDef) -> Self {
        Self::new(name, AttributeKind::Embedded(embeddable))
    }

    /// Create a to-one association attribute.
    pub fn to_one(name: impl Into<String>, to_one: ToOneDef) -> Self {
        Self::new(name, AttributeKind::ToOne(to_one))
    }

    /// Create a collection attribute.
    pub fn plural(name: impl Into<String>, plural: PluralDef) -> Self {
        Self::new(name, AttributeKind::Plural(plural))
    }

    /// Create a discriminated association attribute.
    pub fn any(name: impl Into<String>, any: AnyDef) -> Self {
        Self::new(name, AttributeKind::Any(any))
    }

    fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            selectable: true,
        }
    }

    /// Exclude the attribute from result-set reads (formula or write-only mappings).
    pub fn not_selectable(mut self) -> Self {
        self.selectable = false;
        self
    }

    /// Check if this is a singular basic attribute.
    pub fn is_basic(&self) -> bool {
        matches!(self.kind, AttributeKind::Basic(_))
    }

    /// Number of columns the attribute spans in the owner's row.
    pub fn column_span(&self) -> usize {
        self.columns().len()
    }

    /// Columns the attribute reads from the owner's row, flattened in order.
    ///
    /// Plural attributes contribute nothing: their key lives in the collection table.
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            AttributeKind::Basic(basic) => vec![basic.column.as_str()],
            AttributeKind::Embedded(embeddable) => embeddable.columns(),
            AttributeKind::ToOne(to_one) => to_one.fk_columns.iter().map(String::as_str).collect(),
            AttributeKind::Plural(_) => Vec::new(),
            AttributeKind::Any(any) => vec![any.discriminator_column.as_str(), any.key_column.as_str()],
        }
    }

    /// Value types of the flattened columns, parallel with [`AttributeDef::columns`].
    pub fn column_types(&self) -> Vec<ScalarType> {
        match &self.kind {
            AttributeKind::Basic(basic) => vec![basic.scalar.clone()],
            AttributeKind::Embedded(embeddable) => embeddable
                .attributes
                .iter()
                .flat_map(AttributeDef::column_types)
                .collect(),
            AttributeKind::ToOne(to_one) => vec![ScalarType::Object; to_one.fk_columns.len()],
            AttributeKind::Plural(_) => Vec::new(),
            AttributeKind::Any(any) => vec![ScalarType::String, any.key_type.clone()],
        }
    }
}

impl EmbeddableDef {
    /// Create an embeddable with the given attributes.
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDef>) -> Self {
        Self {
            name: name.into(),
            attributes,
            aggregate_column: None,
        }
    }

    /// Map the embeddable onto a single aggregate column.
    pub fn with_aggregate_column(mut self, column: impl Into<String>) -> Self {
        self.aggregate_column = Some(column.into());
        self
    }

    /// Flattened column list of all component attributes.
    pub fn columns(&self) -> Vec<&str> {
        self.attributes.iter().flat_map(AttributeDef::columns).collect()
    }

    /// Index of a column within the flattened component columns.
    pub fn selectable_index(&self, column: &str) -> Option<usize> {
        self.columns()
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}

impl ToOneDef {
    /// Many-to-one style association with the foreign key on the owner.
    pub fn new(target: impl Into<String>, fk_columns: Vec<String>) -> Self {
        Self {
            target: target.into(),
            fk_columns,
            fetch: FetchTiming::default(),
            side: ForeignKeySide::Referring,
        }
    }

    /// Inverse one-to-one: the target holds the key referencing the owner.
    pub fn inverse(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fk_columns: Vec::new(),
            fetch: FetchTiming::default(),
            side: ForeignKeySide::Target,
        }
    }

    /// Set the default fetch timing.
    pub fn with_fetch(mut self, fetch: FetchTiming) -> Self {
        self.fetch = fetch;
        self
    }
}

impl PluralDef {
    /// Create a collection keyed by the owner's identifier.
    pub fn new(element: CollectionElement) -> Self {
        Self {
            element,
            key_columns: Vec::new(),
            fetch: FetchTiming::default(),
        }
    }

    /// Set explicit collection key columns.
    pub fn with_key_columns(mut self, columns: Vec<String>) -> Self {
        self.key_columns = columns;
        self
    }
}
