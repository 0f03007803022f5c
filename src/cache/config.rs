//! Published cache configuration.
//!
//! Populated from the `[cache]` table of `published-cache.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_ELEMENTS_CACHE_LIMIT: usize = 10_000;

/// Runtime knobs of the property and route caches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache `Elements`-level values of preview accesses in the elements store
    /// instead of the per-snapshot store.
    pub full_cache_when_previewing: bool,
    /// Maximum number of property slots kept in the elements store.
    pub elements_cache_limit: usize,
    /// Memoize route lookups for the lifetime of a published snapshot.
    pub route_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            full_cache_when_previewing: false,
            elements_cache_limit: DEFAULT_ELEMENTS_CACHE_LIMIT,
            route_cache: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            full_cache_when_previewing: settings.full_cache_when_previewing,
            elements_cache_limit: settings.elements_cache_limit.get(),
            route_cache: settings.route_cache,
        }
    }
}

impl CacheConfig {
    /// Returns the elements store limit as NonZeroUsize, clamping to 1 if zero.
    pub fn elements_cache_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.elements_cache_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
