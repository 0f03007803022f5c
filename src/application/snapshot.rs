//! Read snapshots of the published cache.

use std::sync::Arc;

use metrics::counter;
use tracing::trace;

use crate::cache::{
    CachedRoute, ContentTypeCache, ConverterRegistry, PropertyScope, PropertyValueStore,
    RouteCacheKey, SnapshotStore,
};
use crate::domain::content::{ContentNode, NodeId};
use crate::domain::routing::RoutingResult;

use super::content::PublishedContent;
use super::error::PublishedCacheError;
use super::router::ContentRouter;

pub(crate) const METRIC_ROUTE_CACHE_HIT: &str = "published_cache_route_cache_hit_total";
pub(crate) const METRIC_ROUTE_CACHE_MISS: &str = "published_cache_route_cache_miss_total";

/// One consistent read of the published (or preview) cache.
///
/// Snapshot-level property values and memoized routes live in the snapshot
/// store and are dropped with the snapshot.
pub struct PublishedSnapshot {
    preview: bool,
    generation: u64,
    route_cache: bool,
    router: ContentRouter,
    content_types: Arc<ContentTypeCache>,
    converters: Arc<ConverterRegistry>,
    scope: PropertyScope,
    store: Arc<SnapshotStore>,
}

impl PublishedSnapshot {
    pub(super) fn new(
        preview: bool,
        generation: u64,
        route_cache: bool,
        router: ContentRouter,
        content_types: Arc<ContentTypeCache>,
        converters: Arc<ConverterRegistry>,
        mut scope: PropertyScope,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        scope.preview = preview;
        scope.snapshot = Some(store.clone());
        Self {
            preview,
            generation,
            route_cache: route_cache && !preview,
            router,
            content_types,
            converters,
            scope,
            store,
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Route generation of the service when this snapshot was taken.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn resolve_route(
        &self,
        route: &str,
        hide_top_level_node: Option<bool>,
        culture: Option<&str>,
    ) -> Result<RoutingResult, PublishedCacheError> {
        if !self.route_cache {
            return Ok(self
                .router
                .route_to_node(route, self.preview, hide_top_level_node, culture)?);
        }

        let hide = self.router.hide_top_level_node(hide_top_level_node);
        let key = RouteCacheKey::content_by_route(route, hide, culture);
        if let Some(CachedRoute::Content(result)) = self.store.route(&key) {
            counter!(METRIC_ROUTE_CACHE_HIT).increment(1);
            trace!(route, "Route cache hit");
            return Ok(result);
        }

        counter!(METRIC_ROUTE_CACHE_MISS).increment(1);
        let result = self
            .router
            .route_to_node(route, self.preview, Some(hide), culture)?;
        self.store.set_route(key, CachedRoute::Content(result));
        Ok(result)
    }

    pub fn build_route(
        &self,
        id: NodeId,
        hide_top_level_node: Option<bool>,
        culture: Option<&str>,
    ) -> Result<Option<String>, PublishedCacheError> {
        if !self.route_cache {
            return Ok(self
                .router
                .node_to_route(id, self.preview, hide_top_level_node, culture)?);
        }

        let hide = self.router.hide_top_level_node(hide_top_level_node);
        let key = RouteCacheKey::route_by_content(id, hide, culture);
        if let Some(CachedRoute::Route(route)) = self.store.route(&key) {
            counter!(METRIC_ROUTE_CACHE_HIT).increment(1);
            trace!(node_id = id, "Route cache hit");
            return Ok(route);
        }

        counter!(METRIC_ROUTE_CACHE_MISS).increment(1);
        let route = self
            .router
            .node_to_route(id, self.preview, Some(hide), culture)?;
        self.store.set_route(key, CachedRoute::Route(route.clone()));
        Ok(route)
    }

    pub fn resolve_alias(
        &self,
        root_id: Option<NodeId>,
        culture: Option<&str>,
        alias: &str,
    ) -> Result<RoutingResult, PublishedCacheError> {
        Ok(self
            .router
            .resolve_alias(root_id, culture, alias, self.preview)?)
    }

    pub fn content_by_id(&self, id: NodeId) -> Result<Option<PublishedContent>, PublishedCacheError> {
        self.router
            .provider()
            .node_by_id(id, self.preview)?
            .map(|node| self.publish(node))
            .transpose()
    }

    pub fn content_at_root(&self) -> Result<Vec<PublishedContent>, PublishedCacheError> {
        self.router
            .provider()
            .root_nodes(self.preview)?
            .into_iter()
            .map(|node| self.publish(node))
            .collect()
    }

    pub fn content_by_route(
        &self,
        route: &str,
        hide_top_level_node: Option<bool>,
        culture: Option<&str>,
    ) -> Result<Option<PublishedContent>, PublishedCacheError> {
        match self.resolve_route(route, hide_top_level_node, culture)? {
            RoutingResult::Found(id) => self.content_by_id(id),
            RoutingResult::NotFound => Ok(None),
        }
    }

    /// Attach a provider node to the current content type and property stores.
    fn publish(&self, node: Arc<ContentNode>) -> Result<PublishedContent, PublishedCacheError> {
        let content_type = self
            .content_types
            .get_by_id(node.kind(), node.content_type.id)?;
        Ok(PublishedContent::new(
            node,
            content_type,
            Arc::clone(&self.converters),
            self.scope.clone(),
        ))
    }

    /// Number of property slots held by this snapshot.
    pub fn cached_values(&self) -> usize {
        self.store.len()
    }
}
