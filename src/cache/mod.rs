//! Published cache system.
//!
//! Provides the caches behind published content:
//!
//! - **Type cache**: content, media and member type descriptors by alias and id
//! - **Elements store**: converted property values shared by every snapshot
//! - **Snapshot store**: converted property values and route lookups of one snapshot
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `published-cache.toml`:
//!
//! ```toml
//! [cache]
//! full_cache_when_previewing = false
//! elements_cache_limit = 10000
//! route_cache = true
//! ```

mod config;
mod content_types;
mod events;
mod keys;
mod lock;
mod planner;
mod property;
mod store;
mod values;

pub use config::CacheConfig;
pub use content_types::ContentTypeCache;
pub use events::{CacheEvent, CacheNotification, Epoch, EventQueue};
pub use keys::{PropertyCacheKey, RouteCacheKey, content_type_alias_key};
pub use planner::InvalidationPlan;
pub use property::{
    ConverterRegistry, PassThroughConverter, PropertyScope, PropertyValueConverter,
    PublishedProperty,
};
pub use store::{CachedRoute, ElementsStore, PropertyValueStore, SnapshotStore};
pub use values::{CacheValues, ConvertedValue, ValueKind, converted};

pub(crate) mod metric_names {
    pub(crate) use super::content_types::{METRIC_CONTENT_TYPE_HIT, METRIC_CONTENT_TYPE_MISS};
    pub(crate) use super::property::METRIC_PROPERTY_CONVERT;
    pub(crate) use super::store::METRIC_ELEMENTS_LEN;
}
