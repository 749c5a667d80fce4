//! Cache of resolved result-set mappings.
//!
//! Resolution depends only on the mapping definition, the shape of the result
//! set and the enabled fetch profiles, so the resolved [`JdbcValuesMapping`]
//! can be shared between executions that agree on all three.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::mapping::ResultSetMapping;
use super::values_mapping::JdbcValuesMapping;
use crate::error::Result;
use crate::jdbc::{JdbcValuesMetadata, MetadataShape};
use crate::session::{LoadQueryInfluencers, SessionFactory};

/// Cache key of one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingCacheKey {
    mapping: ResultSetMapping,
    shape: MetadataShape,
    fetch_profiles: BTreeSet<String>,
}

impl MappingCacheKey {
    /// Key for resolving `mapping` against `metadata` under `influencers`.
    ///
    /// Dynamic mappings are copied, so later changes to the caller's builder
    /// never alter a stored key.
    pub fn new(
        mapping: &ResultSetMapping,
        metadata: &dyn JdbcValuesMetadata,
        influencers: &LoadQueryInfluencers,
    ) -> Result<Self> {
        Ok(Self {
            mapping: mapping.cache_key_instance().into_owned(),
            shape: MetadataShape::of(metadata)?,
            fetch_profiles: influencers.enabled_fetch_profiles().clone(),
        })
    }

    /// Column shape the resolution was made against.
    pub fn shape(&self) -> &MetadataShape {
        &self.shape
    }
}

/// Cached resolution with metadata.
#[derive(Debug)]
pub struct CachedMapping {
    /// The resolved mapping.
    pub mapping: Arc<JdbcValuesMapping>,
    /// Metamodel version the mapping was resolved against.
    pub schema_version: u64,
    /// Number of cache hits for this entry.
    pub hit_count: AtomicU64,
}

impl CachedMapping {
    fn new(mapping: Arc<JdbcValuesMapping>, schema_version: u64) -> Self {
        Self {
            mapping,
            schema_version,
            hit_count: AtomicU64::new(0),
        }
    }

    /// Increment the hit count and return the new value.
    pub fn record_hit(&self) -> u64 {
        self.hit_count.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    /// Current hit count.
    pub fn hits(&self) -> u64 {
        self.hit_count.load(AtomicOrdering::Relaxed)
    }
}

/// Counters of a [`ResolvedMappingCache`].
#[derive(Debug, Default)]
pub struct MappingCacheStats {
    reuses: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    stale_discards: AtomicU64,
    invalidations: AtomicU64,
}

impl MappingCacheStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Lookups answered with a stored resolution.
    pub fn reuses(&self) -> u64 {
        self.reuses.load(AtomicOrdering::Relaxed)
    }

    /// Lookups that found nothing valid.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Entries dropped to make room.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(AtomicOrdering::Relaxed)
    }

    /// Inserts refused because they were resolved against an older metamodel.
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards.load(AtomicOrdering::Relaxed)
    }

    /// Metamodel replacements seen by the cache.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(AtomicOrdering::Relaxed)
    }

    /// Share of lookups answered from the cache, between 0.0 and 1.0.
    pub fn reuse_rate(&self) -> f64 {
        let lookups = self.reuses() + self.misses();
        if lookups == 0 {
            return 0.0;
        }
        self.reuses() as f64 / lookups as f64
    }
}

/// Thread-safe cache of resolved mappings.
///
/// Entries resolved against an older metamodel version are never returned.
/// When full, the entry with the fewest hits is evicted.
#[derive(Debug)]
pub struct ResolvedMappingCache {
    cache: RwLock<HashMap<MappingCacheKey, CachedMapping>>,
    max_entries: usize,
    current_schema_version: AtomicU64,
    stats: MappingCacheStats,
}

impl ResolvedMappingCache {
    /// Create a cache holding at most `max_entries` resolutions.
    pub fn new(max_entries: usize, schema_version: u64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            current_schema_version: AtomicU64::new(schema_version),
            stats: MappingCacheStats::default(),
        }
    }

    /// Metamodel version entries must have been resolved against.
    pub fn schema_version(&self) -> u64 {
        self.current_schema_version.load(AtomicOrdering::SeqCst)
    }

    /// Cached resolution for `key`, if still valid.
    pub fn get(&self, key: &MappingCacheKey) -> Option<Arc<JdbcValuesMapping>> {
        let current_version = self.schema_version();
        let guard = self.cache.read();

        if let Some(cached) = guard.get(key) {
            if cached.schema_version == current_version {
                cached.record_hit();
                MappingCacheStats::bump(&self.stats.reuses);
                return Some(Arc::clone(&cached.mapping));
            }
        }

        MappingCacheStats::bump(&self.stats.misses);
        None
    }

    /// Store a resolution made against metamodel `schema_version`.
    pub fn insert(&self, key: MappingCacheKey, mapping: Arc<JdbcValuesMapping>, schema_version: u64) {
        if schema_version != self.schema_version() {
            debug!(schema_version, "discarding resolution made against a stale metamodel");
            MappingCacheStats::bump(&self.stats.stale_discards);
            return;
        }

        let mut guard = self.cache.write();
        if guard.len() >= self.max_entries && !guard.contains_key(&key) {
            self.evict_least_used(&mut guard);
        }
        guard.insert(key, CachedMapping::new(mapping, schema_version));
    }

    /// Drop every entry and expect `new_schema_version` from now on.
    pub fn invalidate(&self, new_schema_version: u64) {
        self.current_schema_version
            .store(new_schema_version, AtomicOrdering::SeqCst);
        self.cache.write().clear();
        MappingCacheStats::bump(&self.stats.invalidations);
        debug!(schema_version = new_schema_version, "mapping cache invalidated");
    }

    fn evict_least_used(&self, cache: &mut HashMap<MappingCacheKey, CachedMapping>) {
        let evict_key = cache
            .iter()
            .min_by_key(|(_, cached)| cached.hits())
            .map(|(key, _)| key.clone());

        if let Some(key) = evict_key {
            cache.remove(&key);
            MappingCacheStats::bump(&self.stats.evictions);
        }
    }

    /// Resolve `mapping`, reusing an earlier resolution of the same shape.
    pub fn get_or_resolve(
        &self,
        mapping: &ResultSetMapping,
        metadata: &dyn JdbcValuesMetadata,
        influencers: &LoadQueryInfluencers,
        factory: &SessionFactory,
    ) -> Result<Arc<JdbcValuesMapping>> {
        let key = MappingCacheKey::new(mapping, metadata, influencers)?;
        if let Some(resolved) = self.get(&key) {
            return Ok(resolved);
        }

        let resolved = Arc::new(mapping.resolve(metadata, influencers, factory)?);
        self.insert(key, Arc::clone(&resolved), factory.metamodel().version());
        Ok(resolved)
    }

    pub fn stats(&self) -> &MappingCacheStats {
        &self.stats
    }

    /// Number of stored resolutions.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry without changing the expected metamodel version.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
