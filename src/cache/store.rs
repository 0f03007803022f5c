//! Backing stores for property slots and snapshot route lookups.
//!
//! Elements store: survives across snapshots, LRU-bounded, cleared on content changes.
//! Snapshot store: created per read snapshot and dropped with it.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use lru::LruCache;
use metrics::gauge;

use crate::domain::routing::RoutingResult;

use super::config::CacheConfig;
use super::keys::{PropertyCacheKey, RouteCacheKey};
use super::lock::{rw_read, rw_write};
use super::values::CacheValues;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_ELEMENTS_LEN: &str = "published_cache_elements_len";

/// Keyed store of property slots.
pub trait PropertyValueStore: Send + Sync {
    /// Return the slot for `key`, creating it with `factory` when absent.
    fn get_or_create(
        &self,
        key: &PropertyCacheKey,
        factory: &dyn Fn() -> Arc<CacheValues>,
    ) -> Arc<CacheValues>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Elements store
// ============================================================================

/// Slots of `Elements`-level properties, shared by every snapshot.
pub struct ElementsStore {
    slots: RwLock<LruCache<PropertyCacheKey, Arc<CacheValues>>>,
}

impl ElementsStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            slots: RwLock::new(LruCache::new(config.elements_cache_limit_non_zero())),
        }
    }
}

impl PropertyValueStore for ElementsStore {
    fn get_or_create(
        &self,
        key: &PropertyCacheKey,
        factory: &dyn Fn() -> Arc<CacheValues>,
    ) -> Arc<CacheValues> {
        let mut slots = rw_write(&self.slots, SOURCE, "elements.get_or_create");
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        let slot = factory();
        slots.put(key.clone(), Arc::clone(&slot));
        gauge!(METRIC_ELEMENTS_LEN).set(slots.len() as f64);
        slot
    }

    fn clear(&self) {
        rw_write(&self.slots, SOURCE, "elements.clear").clear();
        gauge!(METRIC_ELEMENTS_LEN).set(0.0);
    }

    fn len(&self) -> usize {
        rw_read(&self.slots, SOURCE, "elements.len").len()
    }
}

// ============================================================================
// Snapshot store
// ============================================================================

/// Memoized route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedRoute {
    Content(RoutingResult),
    Route(Option<String>),
}

/// Per-snapshot slots and route memo.
#[derive(Default)]
pub struct SnapshotStore {
    slots: DashMap<PropertyCacheKey, Arc<CacheValues>>,
    routes: DashMap<RouteCacheKey, CachedRoute>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, key: &RouteCacheKey) -> Option<CachedRoute> {
        self.routes.get(key).map(|entry| entry.value().clone())
    }

    pub fn set_route(&self, key: RouteCacheKey, route: CachedRoute) {
        self.routes.insert(key, route);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl PropertyValueStore for SnapshotStore {
    fn get_or_create(
        &self,
        key: &PropertyCacheKey,
        factory: &dyn Fn() -> Arc<CacheValues>,
    ) -> Arc<CacheValues> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        let slot = self.slots.entry(key.clone()).or_insert_with(factory);
        Arc::clone(slot.value())
    }

    fn clear(&self) {
        self.slots.clear();
        self.routes.clear();
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}
