//! The result-set mapping aggregate.

use super::builders::{ResultBuilder, ScalarResultBuilder};
use super::creation_state::DomainResultCreationState;
use super::fetch::{LegacyFetchBuilder, LegacyFetchBuilders};
use super::selection::ResultSetMappingSqlSelection;
use super::values_mapping::JdbcValuesMapping;
use crate::error::{Error, Result};
use crate::jdbc::JdbcValuesMetadata;
use crate::session::{LoadQueryInfluencers, SessionFactory};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Ordered result builders plus legacy fetch builders, resolvable against the
/// metadata of an executed statement.
///
/// Static mappings are named and immutable once registered; their identity is
/// the name. Dynamic mappings are assembled per query and compare by content.
#[derive(Debug, Clone)]
pub struct ResultSetMapping {
    mapping_identifier: String,
    is_dynamic: bool,
    result_builders: Vec<ResultBuilder>,
    legacy_fetch_builders: LegacyFetchBuilders,
}

impl ResultSetMapping {
    /// Mapping assembled for a single query.
    pub fn dynamic(mapping_identifier: impl Into<String>) -> Self {
        Self::new(mapping_identifier.into(), true)
    }

    /// Named mapping.
    pub fn named(mapping_identifier: impl Into<String>) -> Self {
        Self::new(mapping_identifier.into(), false)
    }

    fn new(mapping_identifier: String, is_dynamic: bool) -> Self {
        Self {
            mapping_identifier,
            is_dynamic,
            result_builders: Vec::new(),
            legacy_fetch_builders: LegacyFetchBuilders::new(),
        }
    }

    /// Resolve the named mapping registered on `factory`.
    pub fn resolve_named(name: &str, factory: &SessionFactory) -> Result<Self> {
        factory
            .named_mapping(name)
            .map(NamedResultSetMappingMemento::to_result_set_mapping)
            .ok_or_else(|| Error::IllegalArgument(format!("no result-set mapping named [{name}]")))
    }

    /// Identifier the mapping was created with.
    pub fn mapping_identifier(&self) -> &str {
        &self.mapping_identifier
    }

    /// Check if the mapping was built for a single query.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Append a top-level result builder.
    ///
    /// Two builders may not claim the same explicit JDBC position.
    pub fn add_result_builder(&mut self, builder: impl Into<ResultBuilder>) -> Result<()> {
        let builder = builder.into();
        let mut claimed: HashSet<usize> = self
            .result_builders
            .iter()
            .flat_map(ResultBuilder::explicit_positions)
            .collect();
        for position in builder.explicit_positions() {
            if !claimed.insert(position) {
                return Err(Error::DuplicateResultPosition(position));
            }
        }
        self.result_builders.push(builder);
        Ok(())
    }

    /// Register a legacy fetch builder under its owner alias and fetchable
    /// name, replacing any earlier one for the same pair.
    pub fn add_legacy_fetch_builder(&mut self, builder: LegacyFetchBuilder) {
        self.legacy_fetch_builders
            .entry(builder.owner_alias.clone())
            .or_default()
            .insert(builder.fetchable_name.clone(), builder);
    }

    /// Get number of top-level result builders.
    pub fn number_of_result_builders(&self) -> usize {
        self.result_builders.len()
    }

    pub fn visit_result_builders(&self, mut visitor: impl FnMut(usize, &ResultBuilder)) {
        for (index, builder) in self.result_builders.iter().enumerate() {
            visitor(index, builder);
        }
    }

    pub fn visit_legacy_fetch_builders(&self, mut visitor: impl FnMut(&LegacyFetchBuilder)) {
        for builder in self.legacy_fetch_builders.values().flat_map(|by_name| by_name.values()) {
            visitor(builder);
        }
    }

    /// Key form of this mapping: the mapping itself when static, a deep copy
    /// when dynamic.
    pub fn cache_key_instance(&self) -> Cow<'_, Self> {
        if self.is_dynamic {
            Cow::Owned(self.clone())
        } else {
            Cow::Borrowed(self)
        }
    }

    /// Memento for registering this mapping by name.
    pub fn to_memento(&self) -> Result<NamedResultSetMappingMemento> {
        if self.is_dynamic {
            return Err(Error::Unsupported(format!(
                "dynamic result-set mapping [{}] cannot be registered by name",
                self.mapping_identifier
            )));
        }
        Ok(NamedResultSetMappingMemento {
            name: self.mapping_identifier.clone(),
            result_builders: self.result_builders.clone(),
            legacy_fetch_builders: self.legacy_fetch_builders.clone(),
        })
    }

    /// Resolve the mapping against the metadata of an executed statement.
    ///
    /// Without result builders every column becomes a scalar result.
    #[instrument(
        skip_all,
        fields(mapping = %self.mapping_identifier, dynamic = self.is_dynamic)
    )]
    pub fn resolve(
        &self,
        metadata: &dyn JdbcValuesMetadata,
        influencers: &LoadQueryInfluencers,
        factory: &SessionFactory,
    ) -> Result<JdbcValuesMapping> {
        let column_count = metadata.column_count();
        let number_of_results = if self.result_builders.is_empty() {
            column_count
        } else {
            self.result_builders.len()
        };

        let mut state =
            DomainResultCreationState::new(factory, metadata, influencers, &self.legacy_fetch_builders);
        let mut domain_results = Vec::with_capacity(number_of_results);
        for position in 0..number_of_results {
            let result = match self.result_builders.get(position) {
                Some(builder) => builder.build(position, &mut state)?,
                None => ScalarResultBuilder::at(position + 1).build_result(position, &mut state)?,
            };
            if result.contains_any_non_scalar_results() {
                state.disallow_positional_selections();
            }
            domain_results.push(result);
        }

        if !self.result_builders.is_empty() {
            self.validate_aliases(metadata, state.selections(), factory)?;
        }

        let (selections, lock_modes) = state.into_parts();
        debug!(
            results = domain_results.len(),
            selections = selections.len(),
            "resolved result-set mapping"
        );
        Ok(JdbcValuesMapping::new(
            selections,
            domain_results,
            column_count,
            lock_modes,
        ))
    }

    /// Resolve through the factory's mapping cache.
    pub fn resolve_cached(
        &self,
        metadata: &dyn JdbcValuesMetadata,
        influencers: &LoadQueryInfluencers,
        factory: &SessionFactory,
    ) -> Result<Arc<JdbcValuesMapping>> {
        factory
            .mapping_cache()
            .get_or_resolve(self, metadata, influencers, factory)
    }

    fn validate_aliases(
        &self,
        metadata: &dyn JdbcValuesMetadata,
        selections: &[Arc<ResultSetMappingSqlSelection>],
        factory: &SessionFactory,
    ) -> Result<()> {
        let mut duplicated: HashMap<String, bool> = HashMap::new();
        for position in 1..=metadata.column_count() {
            duplicated
                .entry(metadata.column_name(position)?.to_ascii_lowercase())
                .and_modify(|duplicate| *duplicate = true)
                .or_insert(false);
        }

        let exempt = self.polymorphic_exemptions(factory)?;
        for selection in selections.iter().filter(|selection| !selection.is_nested()) {
            let alias = metadata.column_name(selection.jdbc_result_set_index())?;
            let key = alias.to_ascii_lowercase();
            if duplicated.get(&key).copied().unwrap_or(false) && !exempt.contains(&key) {
                warn!(alias, "duplicated sql alias in result set");
                return Err(Error::NonUniqueDiscoveredSqlAlias {
                    alias: alias.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Lowercased columns of a lone polymorphic entity result that may appear
    /// more than once in the result set.
    fn polymorphic_exemptions(&self, factory: &SessionFactory) -> Result<HashSet<String>> {
        let mut exempt = HashSet::new();
        let [ResultBuilder::Entity(builder)] = self.result_builders.as_slice() else {
            return Ok(exempt);
        };
        let metamodel = factory.metamodel();
        let entity = builder.entity_name.as_str();
        if !self.legacy_fetch_builders.is_empty()
            || builder.contains_join()
            || !metamodel.is_polymorphic(entity)
        {
            return Ok(exempt);
        }

        exempt.extend(metamodel.key_columns(entity)?.into_iter().map(str::to_ascii_lowercase));
        if let Some(discriminator) = metamodel.discriminator_of(entity)? {
            let column = builder
                .discriminator_alias
                .as_deref()
                .or(discriminator.column.as_deref())
                .unwrap_or(factory.config().discriminator_alias.as_str());
            exempt.insert(column.to_ascii_lowercase());
        }
        if let Some(version) = metamodel.version_of(entity)? {
            exempt.extend(version.columns().into_iter().map(str::to_ascii_lowercase));
        }
        for subclass in metamodel.subclass_closure(entity)?.into_iter().skip(1) {
            for attribute in &subclass.attributes {
                exempt.extend(attribute.columns().into_iter().map(str::to_ascii_lowercase));
            }
        }

        trace!(entity, exempt = exempt.len(), "polymorphic alias exemptions");
        Ok(exempt)
    }
}

impl PartialEq for ResultSetMapping {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_dynamic, other.is_dynamic) {
            (false, false) => self.mapping_identifier == other.mapping_identifier,
            (true, true) => {
                self.result_builders == other.result_builders
                    && self.legacy_fetch_builders == other.legacy_fetch_builders
            }
            _ => false,
        }
    }
}

impl Eq for ResultSetMapping {}

impl Hash for ResultSetMapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_dynamic.hash(state);
        if self.is_dynamic {
            self.result_builders.hash(state);
            self.legacy_fetch_builders.hash(state);
        } else {
            self.mapping_identifier.hash(state);
        }
    }
}

/// Registered form of a named result-set mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResultSetMappingMemento {
    name: String,
    result_builders: Vec<ResultBuilder>,
    legacy_fetch_builders: LegacyFetchBuilders,
}

impl NamedResultSetMappingMemento {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static mapping carrying copies of the registered builders.
    pub fn to_result_set_mapping(&self) -> ResultSetMapping {
        ResultSetMapping {
            mapping_identifier: self.name.clone(),
            is_dynamic: false,
            result_builders: self.result_builders.clone(),
            legacy_fetch_builders: self.legacy_fetch_builders.clone(),
        }
    }
}
