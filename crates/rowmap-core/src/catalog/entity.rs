//! Entity definitions.

use super::attribute::AttributeDef;
use serde::{Deserialize, Serialize};

/// An entity definition.
///
/// Root entities carry the identifier, discriminator and version; subclasses
/// name their super entity and only declare their own attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within the metamodel).
    pub name: String,
    /// Super entity for subclasses.
    #[serde(default)]
    pub super_entity: Option<String>,
    /// Identifier attribute (root entities only).
    #[serde(default)]
    pub identifier: Option<AttributeDef>,
    /// Discriminator (root entities of a hierarchy only).
    #[serde(default)]
    pub discriminator: Option<DiscriminatorDef>,
    /// Optimistic-locking version attribute (root entities only).
    #[serde(default)]
    pub version: Option<AttributeDef>,
    /// Attributes declared by this entity.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

/// How the concrete subclass of a row is determined.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiscriminatorDef {
    /// Discriminator column; `None` means a case expression over the subclass
    /// tables, surfaced in native queries through the discriminator alias.
    #[serde(default)]
    pub column: Option<String>,
}

impl EntityDef {
    /// Create a root entity definition.
    pub fn new(name: impl Into<String>, identifier: AttributeDef) -> Self {
        Self {
            name: name.into(),
            super_entity: None,
            identifier: Some(identifier),
            discriminator: None,
            version: None,
            attributes: Vec::new(),
        }
    }

    /// Create a subclass of `super_entity`.
    pub fn subclass(name: impl Into<String>, super_entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_entity: Some(super_entity.into()),
            identifier: None,
            discriminator: None,
            version: None,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute to the entity.
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add multiple attributes.
    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = AttributeDef>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Use a discriminator column.
    pub fn with_discriminator(mut self, column: impl Into<String>) -> Self {
        self.discriminator = Some(DiscriminatorDef {
            column: Some(column.into()),
        });
        self
    }

    /// Use a case-expression discriminator (joined inheritance).
    pub fn with_case_discriminator(mut self) -> Self {
        self.discriminator = Some(DiscriminatorDef { column: None });
        self
    }

    /// Set the version attribute.
    pub fn with_version(mut self, version: AttributeDef) -> Self {
        self.version = Some(version);
        self
    }

    /// Check if this entity is the root of its hierarchy.
    pub fn is_root(&self) -> bool {
        self.super_entity.is_none()
    }

    /// Get a declared attribute by name, including identifier and version.
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.identifier
            .iter()
            .chain(self.version.iter())
            .chain(self.attributes.iter())
            .find(|a| a.name == name)
    }
}
