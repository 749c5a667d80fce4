//! Resolution configuration.

/// Default maximum depth of joined fetch chains.
pub const DEFAULT_MAX_FETCH_DEPTH: usize = 8;

/// Default result-set alias of case-expression discriminators.
pub const DEFAULT_DISCRIMINATOR_ALIAS: &str = "clazz_";

/// Default capacity of the resolved mapping cache.
pub const DEFAULT_MAPPING_CACHE_CAPACITY: usize = 256;

/// Settings applied to every mapping resolution of a session factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsConfig {
    /// Maximum number of nested joined entity fetches below a root result.
    pub max_fetch_depth: usize,

    /// Result-set alias under which case-expression discriminators are read.
    pub discriminator_alias: String,

    /// Maximum number of resolved mappings kept in the cache.
    pub mapping_cache_capacity: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            max_fetch_depth: DEFAULT_MAX_FETCH_DEPTH,
            discriminator_alias: DEFAULT_DISCRIMINATOR_ALIAS.to_string(),
            mapping_cache_capacity: DEFAULT_MAPPING_CACHE_CAPACITY,
        }
    }
}

impl ResultsConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum joined fetch depth.
    pub fn with_max_fetch_depth(mut self, depth: usize) -> Self {
        self.max_fetch_depth = depth;
        self
    }

    /// Set the discriminator alias.
    pub fn with_discriminator_alias(mut self, alias: impl Into<String>) -> Self {
        self.discriminator_alias = alias.into();
        self
    }

    /// Set the resolved mapping cache capacity (at least 1).
    pub fn with_mapping_cache_capacity(mut self, capacity: usize) -> Self {
        self.mapping_cache_capacity = capacity.max(1);
        self
    }
}
