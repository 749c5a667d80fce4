//! Mapping metamodel - versioned registry of entity definitions.

use super::{AttributeDef, AttributeKind, DiscriminatorDef, EntityDef, ScalarType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A named set of associations fetched eagerly when the profile is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProfile {
    /// Profile name.
    pub name: String,
    /// `(entity, association)` pairs switched to immediate fetching.
    #[serde(default)]
    pub fetches: BTreeSet<(String, String)>,
}

impl FetchProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fetches: BTreeSet::new(),
        }
    }

    /// Add an association to the profile.
    pub fn with_fetch(mut self, entity: impl Into<String>, association: impl Into<String>) -> Self {
        self.fetches.insert((entity.into(), association.into()));
        self
    }

    /// Check if the profile covers an association.
    pub fn covers(&self, entity: &str, association: &str) -> bool {
        self.fetches
            .iter()
            .any(|(e, a)| e == entity && a == association)
    }
}

/// The mapping metamodel consulted while resolving result-set mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingMetamodel {
    /// Metamodel version (monotonically increasing).
    version: u64,
    /// Entity definitions keyed by name.
    entities: HashMap<String, EntityDef>,
    /// Fetch profiles keyed by name.
    fetch_profiles: HashMap<String, FetchProfile>,
}

impl MappingMetamodel {
    /// Create an empty metamodel.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: HashMap::new(),
            fetch_profiles: HashMap::new(),
        }
    }

    /// Add an entity to the metamodel.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a fetch profile.
    pub fn with_fetch_profile(mut self, profile: FetchProfile) -> Self {
        self.fetch_profiles.insert(profile.name.clone(), profile);
        self
    }

    /// Metamodel version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get an entity by name, failing with [`Error::UnknownEntity`].
    pub fn find_entity(&self, name: &str) -> Result<&EntityDef> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// List all entity names, sorted.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Entities from the hierarchy root down to `name`.
    pub fn super_chain(&self, name: &str) -> Result<Vec<&EntityDef>> {
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(entity_name) = current {
            let entity = self.find_entity(entity_name)?;
            if chain.iter().any(|e: &&EntityDef| e.name == entity.name) {
                return Err(Error::IllegalArgument(format!(
                    "entity hierarchy of [{name}] is cyclic"
                )));
            }
            chain.push(entity);
            current = entity.super_entity.as_deref();
        }
        chain.reverse();
        Ok(chain)
    }

    /// Root entity of the hierarchy `name` belongs to.
    pub fn root_of(&self, name: &str) -> Result<&EntityDef> {
        let chain = self.super_chain(name)?;
        chain
            .first()
            .copied()
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Direct subclasses of `name`, sorted by name.
    pub fn subclasses_of(&self, name: &str) -> Vec<&EntityDef> {
        let mut subclasses: Vec<&EntityDef> = self
            .entities
            .values()
            .filter(|e| e.super_entity.as_deref() == Some(name))
            .collect();
        subclasses.sort_by(|a, b| a.name.cmp(&b.name));
        subclasses
    }

    /// `name` followed by every transitive subclass, breadth first.
    pub fn subclass_closure(&self, name: &str) -> Result<Vec<&EntityDef>> {
        let mut closure = vec![self.find_entity(name)?];
        let mut index = 0;
        while index < closure.len() {
            let current = closure[index].name.as_str();
            for subclass in self.subclasses_of(current) {
                if !closure.iter().any(|e| e.name == subclass.name) {
                    closure.push(subclass);
                }
            }
            index += 1;
        }
        Ok(closure)
    }

    /// Check if rows for `name` may belong to more than one concrete entity.
    pub fn is_polymorphic(&self, name: &str) -> bool {
        match self.get_entity(name) {
            Some(entity) => entity.super_entity.is_some() || !self.subclasses_of(name).is_empty(),
            None => false,
        }
    }

    /// Identifier attribute, inherited from the hierarchy root.
    pub fn identifier_of(&self, name: &str) -> Result<&AttributeDef> {
        self.root_of(name)?.identifier.as_ref().ok_or_else(|| {
            Error::IllegalArgument(format!("entity [{name}] has no identifier"))
        })
    }

    /// Discriminator, inherited from the hierarchy root.
    pub fn discriminator_of(&self, name: &str) -> Result<Option<&DiscriminatorDef>> {
        Ok(self.root_of(name)?.discriminator.as_ref())
    }

    /// Version attribute, inherited from the hierarchy root.
    pub fn version_of(&self, name: &str) -> Result<Option<&AttributeDef>> {
        Ok(self.root_of(name)?.version.as_ref())
    }

    /// Identifier columns of an entity, in key order.
    pub fn key_columns(&self, name: &str) -> Result<Vec<&str>> {
        Ok(self.identifier_of(name)?.columns())
    }

    /// Identifier column types, parallel with [`MappingMetamodel::key_columns`].
    pub fn key_types(&self, name: &str) -> Result<Vec<ScalarType>> {
        let identifier = self.identifier_of(name)?;
        match &identifier.kind {
            AttributeKind::ToOne(to_one) => self.key_types(&to_one.target),
            _ => Ok(identifier.column_types()),
        }
    }

    /// Ordinary (non-key) attributes read for a result of entity `name`:
    /// the super chain's attributes followed by those of every subclass.
    pub fn fetchable_attributes(&self, name: &str) -> Result<Vec<&AttributeDef>> {
        let mut attributes = Vec::new();
        let chain = self.super_chain(name)?;
        let closure = self.subclass_closure(name)?;
        for entity in chain.iter().chain(closure.iter().skip(1)) {
            attributes.extend(entity.attributes.iter());
        }
        Ok(attributes)
    }

    /// Find an attribute visible from entity `name`: identifier, version, or an
    /// attribute declared anywhere in the super chain or subclass closure.
    pub fn find_attribute(&self, name: &str, attribute: &str) -> Result<&AttributeDef> {
        let chain = self.super_chain(name)?;
        let closure = self.subclass_closure(name)?;
        chain
            .iter()
            .chain(closure.iter().skip(1))
            .find_map(|e| e.get_attribute(attribute))
            .ok_or_else(|| Error::UnknownAttribute {
                entity: name.to_string(),
                attribute: attribute.to_string(),
            })
    }

    /// Get a fetch profile by name.
    pub fn fetch_profile(&self, name: &str) -> Option<&FetchProfile> {
        self.fetch_profiles.get(name)
    }

    /// Check if any of the enabled profiles covers `association` of `entity`
    /// or of one of its super entities.
    pub fn profiles_cover(
        &self,
        enabled: &BTreeSet<String>,
        entity: &str,
        association: &str,
    ) -> bool {
        let chain = match self.super_chain(entity) {
            Ok(chain) => chain,
            Err(_) => return false,
        };
        enabled
            .iter()
            .filter_map(|profile| self.fetch_profile(profile))
            .any(|profile| chain.iter().any(|e| profile.covers(&e.name, association)))
    }
}
