//! Class metadata cache

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use refract_types::ClassId;
use tracing::debug;

use crate::config::ReflectConfig;
use crate::error::ReflectError;
use crate::metadata::ClassMetadata;
use crate::registry::ClassRegistry;

/// Source of [`ClassMetadata`]
pub trait ReflectorFactory: Send + Sync {
    /// Whether built metadata is memoized
    fn is_class_cache_enabled(&self) -> bool;

    /// Turn memoization on or off; existing entries are kept either way
    fn set_class_cache_enabled(&self, enabled: bool);

    /// Metadata for `class`
    fn find_for_class(&self, class: ClassId) -> Result<Arc<ClassMetadata>, ReflectError>;
}

/// Lazily built, shared class metadata
///
/// Lookups for different classes never contend on a common lock. Two threads
/// asking for the same uncached class may both build it; the first one to
/// publish wins and both get the published instance.
pub struct MetadataCache {
    registry: Arc<ClassRegistry>,
    classes: DashMap<ClassId, Arc<ClassMetadata>>,
    enabled: AtomicBool,
}

impl MetadataCache {
    /// Create an enabled cache over a registry
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self {
            registry,
            classes: DashMap::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Create a cache configured by `config`
    ///
    /// The configured permissions are applied to the registry first.
    pub fn with_config(registry: Arc<ClassRegistry>, config: &ReflectConfig) -> Result<Self, ReflectError> {
        config.apply_permissions(&registry)?;
        let cache = Self::new(registry);
        cache.set_class_cache_enabled(config.class_cache_enabled);
        Ok(cache)
    }

    /// Registry metadata is built from
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Number of cached classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Whether `class` is cached
    pub fn contains(&self, class: ClassId) -> bool {
        self.classes.contains_key(&class)
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        debug!(entries = self.classes.len(), "clearing class metadata cache");
        self.classes.clear();
    }
}

impl ReflectorFactory for MetadataCache {
    fn is_class_cache_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_class_cache_enabled(&self, enabled: bool) {
        debug!(enabled, "class metadata cache toggled");
        self.enabled.store(enabled, Ordering::Release);
    }

    fn find_for_class(&self, class: ClassId) -> Result<Arc<ClassMetadata>, ReflectError> {
        if !self.is_class_cache_enabled() {
            return ClassMetadata::build(&self.registry, class).map(Arc::new);
        }

        if let Some(hit) = self.classes.get(&class) {
            return Ok(Arc::clone(hit.value()));
        }

        debug!(class = class.index(), "class metadata cache miss");
        let built = Arc::new(ClassMetadata::build(&self.registry, class)?);
        let published = self.classes.entry(class).or_insert(built);
        Ok(Arc::clone(published.value()))
    }
}
