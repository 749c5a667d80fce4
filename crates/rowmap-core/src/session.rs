//! Session factory and per-query load influencers.

use crate::catalog::MappingMetamodel;
use crate::config::ResultsConfig;
use crate::jdbc::TypeConfiguration;
use crate::results::{NamedResultSetMappingMemento, ResolvedMappingCache};
use std::collections::{BTreeSet, HashMap};

/// Shared, read-only context for mapping resolution.
///
/// Owns the metamodel, the JDBC type configuration, the named result-set
/// mappings and the resolved mapping cache.
#[derive(Debug)]
pub struct SessionFactory {
    metamodel: MappingMetamodel,
    type_configuration: TypeConfiguration,
    config: ResultsConfig,
    named_mappings: HashMap<String, NamedResultSetMappingMemento>,
    mapping_cache: ResolvedMappingCache,
}

impl SessionFactory {
    /// Create a factory with default configuration.
    pub fn new(metamodel: MappingMetamodel) -> Self {
        Self::with_config(metamodel, ResultsConfig::default())
    }

    /// Create a factory with the given configuration.
    pub fn with_config(metamodel: MappingMetamodel, config: ResultsConfig) -> Self {
        let mapping_cache =
            ResolvedMappingCache::new(config.mapping_cache_capacity, metamodel.version());
        Self {
            metamodel,
            type_configuration: TypeConfiguration::default(),
            config,
            named_mappings: HashMap::new(),
            mapping_cache,
        }
    }

    /// Replace the JDBC type configuration.
    pub fn with_type_configuration(mut self, type_configuration: TypeConfiguration) -> Self {
        self.type_configuration = type_configuration;
        self
    }

    /// Register a named result-set mapping; a later registration under the same name replaces it.
    pub fn with_named_mapping(mut self, memento: NamedResultSetMappingMemento) -> Self {
        self.named_mappings
            .insert(memento.name().to_string(), memento);
        self
    }

    /// Replace the metamodel, invalidating every cached resolution.
    pub fn update_metamodel(&mut self, metamodel: MappingMetamodel) {
        self.mapping_cache.invalidate(metamodel.version());
        self.metamodel = metamodel;
    }

    /// Entity model results are resolved against.
    pub fn metamodel(&self) -> &MappingMetamodel {
        &self.metamodel
    }

    /// JDBC type to scalar type mapping.
    pub fn type_configuration(&self) -> &TypeConfiguration {
        &self.type_configuration
    }

    /// Resolution settings.
    pub fn config(&self) -> &ResultsConfig {
        &self.config
    }

    /// Look up a named result-set mapping.
    pub fn named_mapping(&self, name: &str) -> Option<&NamedResultSetMappingMemento> {
        self.named_mappings.get(name)
    }

    /// Names of all registered result-set mappings, sorted.
    pub fn named_mapping_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named_mappings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Cache of resolved mappings shared by all queries of this factory.
    pub fn mapping_cache(&self) -> &ResolvedMappingCache {
        &self.mapping_cache
    }
}

/// Per-query settings that influence how associations are loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadQueryInfluencers {
    enabled_fetch_profiles: BTreeSet<String>,
}

impl LoadQueryInfluencers {
    /// Influencers with no fetch profile enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable a fetch profile.
    pub fn with_fetch_profile(mut self, profile: impl Into<String>) -> Self {
        self.enabled_fetch_profiles.insert(profile.into());
        self
    }

    /// Enable a fetch profile in place.
    pub fn enable_fetch_profile(&mut self, profile: impl Into<String>) {
        self.enabled_fetch_profiles.insert(profile.into());
    }

    /// Disable a fetch profile.
    pub fn disable_fetch_profile(&mut self, profile: &str) {
        self.enabled_fetch_profiles.remove(profile);
    }

    pub fn is_fetch_profile_enabled(&self, profile: &str) -> bool {
        self.enabled_fetch_profiles.contains(profile)
    }

    pub fn enabled_fetch_profiles(&self) -> &BTreeSet<String> {
        &self.enabled_fetch_profiles
    }
}
