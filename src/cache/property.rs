//! Published properties and their converted-value cache.
//!
//! Each property access resolves its effective cache level from the declared
//! level and the reference level of the caller, picks the matching slot and
//! converts at most once per slot lifetime:
//!
//! | effective level | slot                                                        |
//! |-----------------|-------------------------------------------------------------|
//! | `None`          | throwaway, dropped after the access                         |
//! | `Element`       | owned by the property instance                              |
//! | `Elements`      | elements store; snapshot store for members and for previews |
//! |                 | unless `full_cache_when_previewing` is set                  |
//! | `Snapshot`      | snapshot store                                              |
//!
//! The inter representation does not depend on the cache level and is kept on
//! the property instance.

use std::sync::{Arc, Mutex};

use metrics::counter;
use serde_json::Value;
use tracing::trace;

use crate::application::error::PublishedCacheError;
use crate::application::repos::ProviderError;
use crate::domain::cache_level::{CacheLevel, resolve_cache_level};
use crate::domain::content::{ContentNode, INVARIANT_CULTURE, culture_key};
use crate::domain::content_type::{ItemKind, PropertyTypeDescriptor};

use super::keys::PropertyCacheKey;
use super::lock::mutex_lock;
use super::store::PropertyValueStore;
use super::values::{CacheValues, ConvertedValue, ValueKind, converted};

const SOURCE: &str = "cache::property";

pub(crate) const METRIC_PROPERTY_CONVERT: &str = "published_cache_property_convert_total";

// ============================================================================
// Converters
// ============================================================================

/// Turns raw stored values into typed representations.
///
/// `reference` is the cache level nested conversions must start from when the
/// converter builds further published elements.
pub trait PropertyValueConverter: Send + Sync {
    fn is_converter(&self, property_type: &PropertyTypeDescriptor) -> bool;

    fn source_to_inter(
        &self,
        owner: &ContentNode,
        property_type: &PropertyTypeDescriptor,
        source: Option<&Value>,
        preview: bool,
    ) -> Result<ConvertedValue, ProviderError>;

    fn inter_to_object(
        &self,
        owner: &ContentNode,
        property_type: &PropertyTypeDescriptor,
        reference: CacheLevel,
        inter: &ConvertedValue,
        preview: bool,
    ) -> Result<ConvertedValue, ProviderError>;

    fn inter_to_xpath(
        &self,
        _owner: &ContentNode,
        _property_type: &PropertyTypeDescriptor,
        _reference: CacheLevel,
        inter: &ConvertedValue,
        _preview: bool,
    ) -> Result<ConvertedValue, ProviderError> {
        Ok(Arc::clone(inter))
    }
}

/// Fallback converter: the inter and object values are the raw JSON value,
/// the xpath value is its string form.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughConverter;

impl PropertyValueConverter for PassThroughConverter {
    fn is_converter(&self, _property_type: &PropertyTypeDescriptor) -> bool {
        true
    }

    fn source_to_inter(
        &self,
        _owner: &ContentNode,
        _property_type: &PropertyTypeDescriptor,
        source: Option<&Value>,
        _preview: bool,
    ) -> Result<ConvertedValue, ProviderError> {
        Ok(converted(source.cloned().unwrap_or(Value::Null)))
    }

    fn inter_to_object(
        &self,
        _owner: &ContentNode,
        _property_type: &PropertyTypeDescriptor,
        _reference: CacheLevel,
        inter: &ConvertedValue,
        _preview: bool,
    ) -> Result<ConvertedValue, ProviderError> {
        Ok(Arc::clone(inter))
    }

    fn inter_to_xpath(
        &self,
        _owner: &ContentNode,
        _property_type: &PropertyTypeDescriptor,
        _reference: CacheLevel,
        inter: &ConvertedValue,
        _preview: bool,
    ) -> Result<ConvertedValue, ProviderError> {
        let text = match inter.downcast_ref::<Value>() {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(converted(text))
    }
}

/// Ordered converter lookup; the first converter claiming a property type wins.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn PropertyValueConverter>>,
    fallback: Arc<dyn PropertyValueConverter>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self {
            converters: Vec::new(),
            fallback: Arc::new(PassThroughConverter),
        }
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, converter: Arc<dyn PropertyValueConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    pub fn converter_for(&self, property_type: &PropertyTypeDescriptor) -> Arc<dyn PropertyValueConverter> {
        self.converters
            .iter()
            .find(|converter| converter.is_converter(property_type))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

// ============================================================================
// Published property
// ============================================================================

/// Stores a property may cache into, plus the access mode.
#[derive(Clone)]
pub struct PropertyScope {
    pub preview: bool,
    pub full_cache_when_previewing: bool,
    pub elements: Option<Arc<dyn PropertyValueStore>>,
    pub snapshot: Option<Arc<dyn PropertyValueStore>>,
}

impl PropertyScope {
    /// Scope without backing stores: `Elements` and `Snapshot` values are not cached.
    pub fn detached(preview: bool) -> Self {
        Self {
            preview,
            full_cache_when_previewing: false,
            elements: None,
            snapshot: None,
        }
    }
}

#[derive(Default)]
struct PropertyState {
    inter: CacheValues,
    element: Option<Arc<CacheValues>>,
}

/// A property of a published node.
///
/// The private lock serialises accesses to this instance: a second thread
/// asking for the same representation waits for the first conversion and
/// receives its result. Converters must not read the property they convert.
pub struct PublishedProperty {
    owner: Arc<ContentNode>,
    property_type: PropertyTypeDescriptor,
    converter: Arc<dyn PropertyValueConverter>,
    scope: PropertyScope,
    cache_key: PropertyCacheKey,
    state: Mutex<PropertyState>,
}

impl PublishedProperty {
    pub fn new(
        owner: Arc<ContentNode>,
        property_type: PropertyTypeDescriptor,
        converter: Arc<dyn PropertyValueConverter>,
        scope: PropertyScope,
    ) -> Self {
        let cache_key = PropertyCacheKey::new(scope.preview, owner.key, property_type.alias.clone());
        Self {
            owner,
            property_type,
            converter,
            scope,
            cache_key,
            state: Mutex::new(PropertyState::default()),
        }
    }

    pub fn alias(&self) -> &str {
        &self.property_type.alias
    }

    pub fn property_type(&self) -> &PropertyTypeDescriptor {
        &self.property_type
    }

    pub fn owner(&self) -> &ContentNode {
        &self.owner
    }

    /// Whether a non-blank raw value is stored for the culture.
    pub fn has_value(&self, culture: Option<&str>) -> bool {
        let culture = self.value_culture(culture);
        match self.owner.raw_value(self.alias(), Some(culture.as_str())) {
            None | Some(Value::Null) => false,
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Object value for a top-level access.
    pub fn value(&self, culture: Option<&str>) -> Result<ConvertedValue, PublishedCacheError> {
        self.get_or_compute(CacheLevel::Element, ValueKind::Object, culture)
            .map(|(value, _)| value)
    }

    /// Return the requested representation, converting it at most once per slot.
    ///
    /// Returns the value together with the reference level nested accesses
    /// must continue with.
    pub fn get_or_compute(
        &self,
        reference: CacheLevel,
        kind: ValueKind,
        culture: Option<&str>,
    ) -> Result<(ConvertedValue, CacheLevel), PublishedCacheError> {
        let resolved = resolve_cache_level(self.property_type.cache_level, reference);
        let culture = self.value_culture(culture);

        let mut state = mutex_lock(&self.state, SOURCE, "get_or_compute");
        if kind == ValueKind::Inter {
            let inter = self.inter_value(&state, &culture)?;
            return Ok((inter, resolved.reference));
        }

        let slot = self.slot(&mut state, resolved.effective);
        if let Some(value) = slot.get(&culture, kind) {
            return Ok((value, resolved.reference));
        }

        // Only a miss needs the inter value.
        let inter = self.inter_value(&state, &culture)?;

        let value = match kind {
            ValueKind::XPath => self.converter.inter_to_xpath(
                &self.owner,
                &self.property_type,
                resolved.reference,
                &inter,
                self.scope.preview,
            ),
            _ => self.converter.inter_to_object(
                &self.owner,
                &self.property_type,
                resolved.reference,
                &inter,
                self.scope.preview,
            ),
        }
        .map_err(|err| PublishedCacheError::conversion(self.alias(), err))?;

        counter!(METRIC_PROPERTY_CONVERT).increment(1);
        trace!(
            node_id = self.owner.id,
            alias = self.alias(),
            level = %resolved.effective,
            kind = ?kind,
            "Converted property value"
        );

        Ok((slot.get_or_insert(&culture, kind, value), resolved.reference))
    }

    fn value_culture(&self, culture: Option<&str>) -> String {
        if self.property_type.varies_by_culture {
            culture_key(culture)
        } else {
            INVARIANT_CULTURE.to_string()
        }
    }

    fn inter_value(
        &self,
        state: &PropertyState,
        culture: &str,
    ) -> Result<ConvertedValue, PublishedCacheError> {
        if let Some(inter) = state.inter.get(culture, ValueKind::Inter) {
            return Ok(inter);
        }

        let source = self.owner.raw_value(self.alias(), Some(culture));
        let inter = self
            .converter
            .source_to_inter(&self.owner, &self.property_type, source, self.scope.preview)
            .map_err(|err| PublishedCacheError::conversion(self.alias(), err))?;
        Ok(state.inter.get_or_insert(culture, ValueKind::Inter, inter))
    }

    fn slot(&self, state: &mut PropertyState, level: CacheLevel) -> Arc<CacheValues> {
        match level {
            CacheLevel::None => Arc::new(CacheValues::new()),
            CacheLevel::Element => Arc::clone(
                state
                    .element
                    .get_or_insert_with(|| Arc::new(CacheValues::new())),
            ),
            CacheLevel::Elements => {
                let shareable = (!self.scope.preview || self.scope.full_cache_when_previewing)
                    && self.owner.kind() != ItemKind::Member;
                let store = if shareable {
                    self.scope.elements.as_ref()
                } else {
                    self.scope.snapshot.as_ref()
                };
                self.store_slot(store)
            }
            CacheLevel::Snapshot => self.store_slot(self.scope.snapshot.as_ref()),
        }
    }

    fn store_slot(&self, store: Option<&Arc<dyn PropertyValueStore>>) -> Arc<CacheValues> {
        match store {
            Some(store) => store.get_or_create(&self.cache_key, &|| Arc::new(CacheValues::new())),
            None => Arc::new(CacheValues::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::cache::config::CacheConfig;
    use crate::cache::store::{ElementsStore, SnapshotStore};
    use crate::domain::content_type::ContentTypeDescriptor;

    use super::*;

    /// Counts conversions and returns a fresh number each time.
    #[derive(Default)]
    struct CountingConverter {
        inter_calls: AtomicUsize,
        object_calls: AtomicUsize,
        xpath_calls: AtomicUsize,
        last_reference: Mutex<Option<CacheLevel>>,
    }

    impl PropertyValueConverter for CountingConverter {
        fn is_converter(&self, _property_type: &PropertyTypeDescriptor) -> bool {
            true
        }

        fn source_to_inter(
            &self,
            _owner: &ContentNode,
            _property_type: &PropertyTypeDescriptor,
            source: Option<&Value>,
            _preview: bool,
        ) -> Result<ConvertedValue, ProviderError> {
            self.inter_calls.fetch_add(1, Ordering::SeqCst);
            Ok(converted(source.cloned().unwrap_or(Value::Null)))
        }

        fn inter_to_object(
            &self,
            _owner: &ContentNode,
            _property_type: &PropertyTypeDescriptor,
            reference: CacheLevel,
            _inter: &ConvertedValue,
            _preview: bool,
        ) -> Result<ConvertedValue, ProviderError> {
            *self.last_reference.lock().expect("reference lock") = Some(reference);
            Ok(converted(self.object_calls.fetch_add(1, Ordering::SeqCst)))
        }

        fn inter_to_xpath(
            &self,
            _owner: &ContentNode,
            _property_type: &PropertyTypeDescriptor,
            _reference: CacheLevel,
            _inter: &ConvertedValue,
            _preview: bool,
        ) -> Result<ConvertedValue, ProviderError> {
            Ok(converted(self.xpath_calls.fetch_add(1, Ordering::SeqCst)))
        }
    }

    fn node(kind: ItemKind, level: CacheLevel) -> (Arc<ContentNode>, PropertyTypeDescriptor) {
        let property_type = PropertyTypeDescriptor::new("title", -88, level);
        let content_type = Arc::new(
            ContentTypeDescriptor::new(1044, "page", kind).with_property(property_type.clone()),
        );
        let node = ContentNode::new(1046, "Home", content_type).property(
            "title",
            None,
            json!("Hello"),
        );
        (Arc::new(node), property_type)
    }

    fn scope(preview: bool) -> (PropertyScope, Arc<ElementsStore>, Arc<SnapshotStore>) {
        let elements = Arc::new(ElementsStore::new(&CacheConfig::default()));
        let snapshot = Arc::new(SnapshotStore::new());
        let scope = PropertyScope {
            preview,
            full_cache_when_previewing: false,
            elements: Some(elements.clone()),
            snapshot: Some(snapshot.clone()),
        };
        (scope, elements, snapshot)
    }

    fn object_number(value: &ConvertedValue) -> usize {
        *value.downcast_ref::<usize>().expect("usize value")
    }

    #[test]
    fn element_level_converts_once_per_instance() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Element);
        let converter = Arc::new(CountingConverter::default());
        let (scope, elements, snapshot) = scope(false);
        let property = PublishedProperty::new(owner, property_type, converter.clone(), scope);

        let first = property.value(None).expect("first");
        let second = property.value(None).expect("second");

        assert_eq!(object_number(&first), 0);
        assert_eq!(object_number(&second), 0);
        assert_eq!(converter.object_calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.inter_calls.load(Ordering::SeqCst), 1);
        assert!(elements.is_empty());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn none_level_converts_every_time_but_keeps_inter() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::None);
        let converter = Arc::new(CountingConverter::default());
        let (scope, _, _) = scope(false);
        let property = PublishedProperty::new(owner, property_type, converter.clone(), scope);

        let (first, reference) = property
            .get_or_compute(CacheLevel::Snapshot, ValueKind::Object, None)
            .expect("first");
        let (second, _) = property
            .get_or_compute(CacheLevel::Snapshot, ValueKind::Object, None)
            .expect("second");

        assert_eq!(reference, CacheLevel::None);
        assert_eq!(object_number(&first), 0);
        assert_eq!(object_number(&second), 1);
        assert_eq!(converter.inter_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_level_is_shared_between_instances() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Snapshot);
        let converter = Arc::new(CountingConverter::default());
        let (scope, elements, snapshot) = scope(false);

        let first = PublishedProperty::new(
            owner.clone(),
            property_type.clone(),
            converter.clone(),
            scope.clone(),
        );
        let second = PublishedProperty::new(owner, property_type, converter.clone(), scope);

        let (value, reference) = first
            .get_or_compute(CacheLevel::Element, ValueKind::Object, None)
            .expect("first");
        assert_eq!(reference, CacheLevel::Snapshot);
        assert_eq!(
            *converter.last_reference.lock().expect("reference lock"),
            Some(CacheLevel::Snapshot)
        );

        let again = second.value(None).expect("second");
        assert_eq!(object_number(&value), object_number(&again));
        assert_eq!(converter.object_calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.inter_calls.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.len(), 1);
        assert!(elements.is_empty());
    }

    #[test]
    fn broader_reference_keeps_value_on_element() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Elements);
        let converter = Arc::new(CountingConverter::default());
        let (scope, elements, snapshot) = scope(false);
        let property = PublishedProperty::new(owner, property_type, converter, scope);

        let (_, reference) = property
            .get_or_compute(CacheLevel::Snapshot, ValueKind::Object, None)
            .expect("value");

        assert_eq!(reference, CacheLevel::Snapshot);
        assert!(elements.is_empty());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn elements_level_uses_elements_store_when_published() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Elements);
        let (scope, elements, snapshot) = scope(false);
        let property = PublishedProperty::new(
            owner,
            property_type,
            Arc::new(CountingConverter::default()),
            scope,
        );

        property.value(None).expect("value");
        assert_eq!(elements.len(), 1);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn elements_level_previews_stay_in_snapshot_store() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Elements);
        let (scope, elements, snapshot) = scope(true);
        let property = PublishedProperty::new(
            owner,
            property_type,
            Arc::new(CountingConverter::default()),
            scope,
        );

        property.value(None).expect("value");
        assert!(elements.is_empty());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn elements_level_previews_can_be_fully_cached() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Elements);
        let (mut scope, elements, snapshot) = scope(true);
        scope.full_cache_when_previewing = true;
        let property = PublishedProperty::new(
            owner,
            property_type,
            Arc::new(CountingConverter::default()),
            scope,
        );

        property.value(None).expect("value");
        assert_eq!(elements.len(), 1);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn members_never_use_the_elements_store() {
        let (owner, property_type) = node(ItemKind::Member, CacheLevel::Elements);
        let (scope, elements, snapshot) = scope(false);
        let property = PublishedProperty::new(
            owner,
            property_type,
            Arc::new(CountingConverter::default()),
            scope,
        );

        property.value(None).expect("value");
        assert!(elements.is_empty());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn representations_are_cached_independently() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Element);
        let converter = Arc::new(CountingConverter::default());
        let (scope, _, _) = scope(false);
        let property = PublishedProperty::new(owner, property_type, converter.clone(), scope);

        for _ in 0..3 {
            property
                .get_or_compute(CacheLevel::Element, ValueKind::Object, None)
                .expect("object");
            property
                .get_or_compute(CacheLevel::Element, ValueKind::XPath, None)
                .expect("xpath");
            let (inter, _) = property
                .get_or_compute(CacheLevel::Element, ValueKind::Inter, None)
                .expect("inter");
            assert_eq!(inter.downcast_ref::<Value>(), Some(&json!("Hello")));
        }

        assert_eq!(converter.inter_calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.object_calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.xpath_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_scope_does_not_cache_store_levels() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Snapshot);
        let converter = Arc::new(CountingConverter::default());
        let property = PublishedProperty::new(
            owner,
            property_type,
            converter.clone(),
            PropertyScope::detached(false),
        );

        property.value(None).expect("first");
        property.value(None).expect("second");
        assert_eq!(converter.object_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_access_converts_once() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Element);
        let converter = Arc::new(CountingConverter::default());
        let (scope, _, _) = scope(false);
        let property = PublishedProperty::new(owner, property_type, converter.clone(), scope);

        std::thread::scope(|threads| {
            for _ in 0..8 {
                threads.spawn(|| property.value(None).expect("value"));
            }
        });

        assert_eq!(converter.object_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pass_through_converter_exposes_json_and_text() {
        let (owner, property_type) = node(ItemKind::Content, CacheLevel::Element);
        let (scope, _, _) = scope(false);
        let property = PublishedProperty::new(
            owner,
            property_type,
            ConverterRegistry::new().converter_for(&PropertyTypeDescriptor::new(
                "title",
                -88,
                CacheLevel::Element,
            )),
            scope,
        );

        let object = property.value(None).expect("object");
        assert_eq!(object.downcast_ref::<Value>(), Some(&json!("Hello")));
        let (xpath, _) = property
            .get_or_compute(CacheLevel::Element, ValueKind::XPath, None)
            .expect("xpath");
        assert_eq!(xpath.downcast_ref::<String>().map(String::as_str), Some("Hello"));
        assert!(property.has_value(None));
    }
}
