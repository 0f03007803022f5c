//! Read-through content-type cache.
//!
//! Descriptors are loaded from the [`ContentTypeSource`] on first miss and
//! stored once, under both their alias key and their id, so lookups by either
//! key hand out the same `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use metrics::counter;
use tracing::debug;

use crate::application::error::PublishedCacheError;
use crate::application::repos::ContentTypeSource;
use crate::domain::content_type::{ContentTypeDescriptor, ItemKind};

use super::keys::content_type_alias_key;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::content_types";

pub(crate) const METRIC_CONTENT_TYPE_HIT: &str = "published_cache_content_type_hit_total";
pub(crate) const METRIC_CONTENT_TYPE_MISS: &str = "published_cache_content_type_miss_total";

#[derive(Default)]
struct TypeMaps {
    by_alias: HashMap<String, Arc<ContentTypeDescriptor>>,
    by_id: HashMap<(ItemKind, i32), Arc<ContentTypeDescriptor>>,
}

impl TypeMaps {
    fn store(&mut self, requested_alias_key: Option<String>, descriptor: &Arc<ContentTypeDescriptor>) {
        let own_key = content_type_alias_key(descriptor.kind, &descriptor.alias);
        if let Some(requested) = requested_alias_key.filter(|key| *key != own_key) {
            self.by_alias.insert(requested, Arc::clone(descriptor));
        }
        self.by_alias.insert(own_key, Arc::clone(descriptor));
        self.by_id
            .insert((descriptor.kind, descriptor.id), Arc::clone(descriptor));
    }

    fn remove_id(&mut self, id: i32) -> bool {
        let before = self.by_id.len();
        self.by_id.retain(|(_, type_id), _| *type_id != id);
        self.by_alias.retain(|_, descriptor| descriptor.id != id);
        self.by_id.len() != before
    }
}

/// Thread-safe cache of content, media and member type descriptors.
///
/// Hits only take the shared lock. A miss takes the exclusive lock, checks
/// again and loads from the source while holding it, so a miss is never loaded
/// twice. The source must not look types up through this cache.
pub struct ContentTypeCache {
    source: Arc<dyn ContentTypeSource>,
    maps: RwLock<TypeMaps>,
}

impl ContentTypeCache {
    pub fn new(source: Arc<dyn ContentTypeSource>) -> Self {
        Self {
            source,
            maps: RwLock::new(TypeMaps::default()),
        }
    }

    pub fn get_by_alias(
        &self,
        kind: ItemKind,
        alias: &str,
    ) -> Result<Arc<ContentTypeDescriptor>, PublishedCacheError> {
        let key = content_type_alias_key(kind, alias);

        let cached = rw_read(&self.maps, SOURCE, "get_by_alias")
            .by_alias
            .get(&key)
            .cloned();
        if let Some(descriptor) = cached {
            counter!(METRIC_CONTENT_TYPE_HIT).increment(1);
            return Ok(descriptor);
        }

        let mut maps = rw_write(&self.maps, SOURCE, "get_by_alias.load");
        if let Some(descriptor) = maps.by_alias.get(&key) {
            counter!(METRIC_CONTENT_TYPE_HIT).increment(1);
            return Ok(Arc::clone(descriptor));
        }

        counter!(METRIC_CONTENT_TYPE_MISS).increment(1);
        let descriptor = self
            .source
            .by_alias(kind, alias)?
            .map(Arc::new)
            .ok_or_else(|| PublishedCacheError::missing_content_type(kind, alias))?;
        maps.store(Some(key), &descriptor);

        debug!(
            kind = %kind,
            alias,
            type_id = descriptor.id,
            "Loaded content type by alias"
        );
        Ok(descriptor)
    }

    pub fn get_by_id(
        &self,
        kind: ItemKind,
        id: i32,
    ) -> Result<Arc<ContentTypeDescriptor>, PublishedCacheError> {
        let cached = rw_read(&self.maps, SOURCE, "get_by_id")
            .by_id
            .get(&(kind, id))
            .cloned();
        if let Some(descriptor) = cached {
            counter!(METRIC_CONTENT_TYPE_HIT).increment(1);
            return Ok(descriptor);
        }

        let mut maps = rw_write(&self.maps, SOURCE, "get_by_id.load");
        if let Some(descriptor) = maps.by_id.get(&(kind, id)) {
            counter!(METRIC_CONTENT_TYPE_HIT).increment(1);
            return Ok(Arc::clone(descriptor));
        }

        counter!(METRIC_CONTENT_TYPE_MISS).increment(1);
        let descriptor = self
            .source
            .by_id(kind, id)?
            .map(Arc::new)
            .ok_or_else(|| PublishedCacheError::missing_content_type(kind, id))?;
        maps.store(None, &descriptor);

        debug!(
            kind = %kind,
            type_id = id,
            alias = %descriptor.alias,
            "Loaded content type by id"
        );
        Ok(descriptor)
    }

    /// Drop every cached descriptor.
    pub fn invalidate_all(&self) {
        let mut maps = rw_write(&self.maps, SOURCE, "invalidate_all");
        maps.by_alias.clear();
        maps.by_id.clear();
        debug!("Cleared content type cache");
    }

    pub fn invalidate_type(&self, id: i32) {
        self.invalidate_types(&[id]);
    }

    pub fn invalidate_types(&self, ids: &[i32]) {
        let mut maps = rw_write(&self.maps, SOURCE, "invalidate_types");
        for &id in ids {
            if maps.remove_id(id) {
                debug!(type_id = id, "Invalidated content type");
            }
        }
    }

    pub fn invalidate_data_type(&self, data_type_id: i32) {
        self.invalidate_data_types(&[data_type_id]);
    }

    /// Drop every descriptor with a property type using one of the data types.
    ///
    /// Descriptors embed their full property set, inherited properties
    /// included, so composed types need no separate pass.
    pub fn invalidate_data_types(&self, data_type_ids: &[i32]) {
        let mut maps = rw_write(&self.maps, SOURCE, "invalidate_data_types");
        let affected: Vec<i32> = maps
            .by_id
            .values()
            .filter(|descriptor| {
                data_type_ids
                    .iter()
                    .any(|&data_type_id| descriptor.uses_data_type(data_type_id))
            })
            .map(|descriptor| descriptor.id)
            .collect();

        for id in affected {
            maps.remove_id(id);
            debug!(type_id = id, "Invalidated content type after data type change");
        }
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        rw_read(&self.maps, SOURCE, "len").by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::application::repos::ProviderError;
    use crate::domain::cache_level::CacheLevel;
    use crate::domain::content_type::PropertyTypeDescriptor;

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn descriptors() -> Vec<ContentTypeDescriptor> {
            vec![
                ContentTypeDescriptor::new(1044, "page", ItemKind::Content)
                    .with_property(PropertyTypeDescriptor::new("title", -88, CacheLevel::Element))
                    .with_property(PropertyTypeDescriptor::new("body", -87, CacheLevel::Snapshot)),
                ContentTypeDescriptor::new(1045, "article", ItemKind::Content)
                    .with_property(PropertyTypeDescriptor::new("title", -88, CacheLevel::Element)),
                ContentTypeDescriptor::new(1032, "image", ItemKind::Media)
                    .with_property(PropertyTypeDescriptor::new("file", -90, CacheLevel::Elements)),
            ]
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ContentTypeSource for CountingSource {
        fn by_alias(
            &self,
            kind: ItemKind,
            alias: &str,
        ) -> Result<Option<ContentTypeDescriptor>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if alias == "broken" {
                return Err(ProviderError::new("schema store offline"));
            }
            Ok(Self::descriptors()
                .into_iter()
                .find(|descriptor| descriptor.kind == kind && descriptor.alias == alias))
        }

        fn by_id(
            &self,
            kind: ItemKind,
            id: i32,
        ) -> Result<Option<ContentTypeDescriptor>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Self::descriptors()
                .into_iter()
                .find(|descriptor| descriptor.kind == kind && descriptor.id == id))
        }
    }

    fn cache() -> (Arc<CountingSource>, ContentTypeCache) {
        let source = Arc::new(CountingSource::default());
        let cache = ContentTypeCache::new(source.clone());
        (source, cache)
    }

    #[test]
    fn alias_and_id_lookups_share_one_descriptor() {
        let (source, cache) = cache();

        let by_alias = cache.get_by_alias(ItemKind::Content, "page").expect("page");
        let by_id = cache.get_by_id(ItemKind::Content, 1044).expect("page by id");

        assert!(Arc::ptr_eq(&by_alias, &by_id));
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_type_is_a_distinct_error() {
        let (_, cache) = cache();

        let err = cache
            .get_by_alias(ItemKind::Content, "nope")
            .expect_err("missing type");
        assert!(matches!(
            err,
            PublishedCacheError::MissingContentType {
                kind: ItemKind::Content,
                ..
            }
        ));

        let err = cache.get_by_id(ItemKind::Media, 1044).expect_err("wrong kind");
        assert!(matches!(err, PublishedCacheError::MissingContentType { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn id_lookups_are_scoped_by_kind() {
        let (source, cache) = cache();

        cache.get_by_id(ItemKind::Content, 1044).expect("content type");
        let err = cache
            .get_by_id(ItemKind::Media, 1044)
            .expect_err("no media type with that id");
        assert!(matches!(
            err,
            PublishedCacheError::MissingContentType {
                kind: ItemKind::Media,
                ..
            }
        ));
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn provider_failures_propagate() {
        let (_, cache) = cache();
        let err = cache
            .get_by_alias(ItemKind::Content, "broken")
            .expect_err("provider failure");
        assert!(matches!(err, PublishedCacheError::Provider(_)));
    }

    #[test]
    fn invalidate_type_reloads_only_that_type() {
        let (source, cache) = cache();
        let page = cache.get_by_alias(ItemKind::Content, "page").expect("page");
        cache.get_by_alias(ItemKind::Content, "article").expect("article");
        assert_eq!(source.calls(), 2);

        cache.invalidate_type(1044);
        assert_eq!(cache.len(), 1);

        let reloaded = cache.get_by_alias(ItemKind::Content, "page").expect("page");
        assert!(!Arc::ptr_eq(&page, &reloaded));
        cache.get_by_alias(ItemKind::Content, "article").expect("article");
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn invalidate_data_type_removes_every_user() {
        let (source, cache) = cache();
        cache.get_by_alias(ItemKind::Content, "page").expect("page");
        cache.get_by_alias(ItemKind::Content, "article").expect("article");
        cache.get_by_alias(ItemKind::Media, "image").expect("image");

        cache.invalidate_data_type(-88);
        assert_eq!(cache.len(), 1);
        assert_eq!(source.calls(), 3);

        cache.get_by_id(ItemKind::Media, 1032).expect("image still cached");
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn invalidate_all_clears_both_maps() {
        let (source, cache) = cache();
        cache.get_by_alias(ItemKind::Media, "image").expect("image");
        cache.invalidate_all();
        assert!(cache.is_empty());
        cache.get_by_id(ItemKind::Media, 1032).expect("image");
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn media_and_member_aliases_do_not_collide() {
        let (_, cache) = cache();
        cache.get_by_alias(ItemKind::Media, "image").expect("image");
        let err = cache
            .get_by_alias(ItemKind::Member, "image")
            .expect_err("no member type");
        assert!(matches!(err, PublishedCacheError::MissingContentType { .. }));
    }

    #[test]
    fn concurrent_lookups_construct_one_descriptor() {
        let (source, cache) = cache();

        let descriptors: Vec<Arc<ContentTypeDescriptor>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let cache = &cache;
                    scope.spawn(move || {
                        if i % 2 == 0 {
                            cache.get_by_alias(ItemKind::Content, "page").expect("page")
                        } else {
                            cache.get_by_id(ItemKind::Content, 1044).expect("page by id")
                        }
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("lookup thread"))
                .collect()
        });

        let first = &descriptors[0];
        assert!(descriptors.iter().all(|other| Arc::ptr_eq(first, other)));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let (_, cache) = cache();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.maps.write().expect("type maps lock should be acquired");
            panic!("poison type maps lock");
        }));

        cache.get_by_alias(ItemKind::Content, "page").expect("page");
        assert_eq!(cache.len(), 1);
    }
}
