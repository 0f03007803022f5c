//! Composition root of the published cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::histogram;
use tracing::{info, instrument};

use crate::cache::{
    CacheConfig, CacheNotification, ContentTypeCache, ConverterRegistry, ElementsStore,
    EventQueue, InvalidationPlan, PropertyScope, PropertyValueStore,
};
use crate::config::Settings;

use super::repos::{ContentTreeProvider, ContentTypeSource};
use super::router::{ContentRouter, RouterOptions};
use super::snapshot::PublishedSnapshot;

pub(crate) const METRIC_NOTIFY_MS: &str = "published_cache_notify_ms";

/// Owns the caches that outlive a snapshot and hands out snapshots.
pub struct PublishedCacheService {
    config: CacheConfig,
    router: ContentRouter,
    content_types: Arc<ContentTypeCache>,
    converters: Arc<ConverterRegistry>,
    elements: Arc<ElementsStore>,
    queue: EventQueue,
    generation: AtomicU64,
}

impl PublishedCacheService {
    pub fn new(
        settings: &Settings,
        tree: Arc<dyn ContentTreeProvider>,
        type_source: Arc<dyn ContentTypeSource>,
        converters: ConverterRegistry,
    ) -> Self {
        let config = CacheConfig::from(&settings.cache);
        let options = RouterOptions::from(&settings.routing);
        let content_types = Arc::new(ContentTypeCache::new(type_source));
        Self {
            elements: Arc::new(ElementsStore::new(&config)),
            config,
            router: ContentRouter::new(tree, options).with_content_types(Arc::clone(&content_types)),
            content_types,
            converters: Arc::new(converters),
            queue: EventQueue::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn router(&self) -> &ContentRouter {
        &self.router
    }

    pub fn content_types(&self) -> &ContentTypeCache {
        &self.content_types
    }

    pub fn elements(&self) -> &ElementsStore {
        &self.elements
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn create_snapshot(&self, preview: bool) -> PublishedSnapshot {
        let scope = PropertyScope {
            preview,
            full_cache_when_previewing: self.config.full_cache_when_previewing,
            elements: Some(self.elements.clone()),
            snapshot: None,
        };
        PublishedSnapshot::new(
            preview,
            self.generation(),
            self.config.route_cache,
            self.router.clone(),
            Arc::clone(&self.content_types),
            Arc::clone(&self.converters),
            scope,
        )
    }

    /// Queue a change notification and apply everything pending.
    ///
    /// Snapshots taken earlier keep their own values; only the shared caches
    /// are invalidated.
    #[instrument(skip(self))]
    pub fn notify(&self, notification: CacheNotification) {
        self.queue.publish(notification);
        self.apply_pending();
    }

    fn apply_pending(&self) {
        let events = self.queue.drain_all();
        if events.is_empty() {
            return;
        }

        let start = Instant::now();
        let plan = InvalidationPlan::from_events(events);

        if plan.refresh_all {
            self.content_types.invalidate_all();
        } else {
            if !plan.content_types.is_empty() {
                let ids: Vec<i32> = plan.content_types.iter().copied().collect();
                self.content_types.invalidate_types(&ids);
            }
            if !plan.data_types.is_empty() {
                let ids: Vec<i32> = plan.data_types.iter().copied().collect();
                self.content_types.invalidate_data_types(&ids);
            }
        }
        if plan.clear_elements {
            self.elements.clear();
        }
        if plan.routes_changed {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_NOTIFY_MS).record(elapsed_ms);
        info!(plan = %plan, elapsed_ms, "Applied cache notifications");
    }
}

impl From<&crate::config::RoutingSettings> for RouterOptions {
    fn from(settings: &crate::config::RoutingSettings) -> Self {
        Self {
            hide_top_level_node: settings.hide_top_level_node,
            url_alias_property: settings.url_alias_property.clone(),
            alias_matching: settings.alias_matching,
        }
    }
}
