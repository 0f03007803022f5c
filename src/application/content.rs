//! Published content items handed out by a snapshot.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::cache::{
    ConvertedValue, ConverterRegistry, PropertyScope, PublishedProperty, ValueKind,
};
use crate::domain::cache_level::CacheLevel;
use crate::domain::content::{ContentNode, NodeId};
use crate::domain::content_type::{ContentTypeDescriptor, ItemKind};

use super::error::PublishedCacheError;

/// A node together with its published properties.
///
/// Properties are created on first access, one per property type of the
/// cached content type, and live as long as this item.
pub struct PublishedContent {
    node: Arc<ContentNode>,
    content_type: Arc<ContentTypeDescriptor>,
    converters: Arc<ConverterRegistry>,
    scope: PropertyScope,
    properties: OnceCell<Vec<Arc<PublishedProperty>>>,
}

impl PublishedContent {
    pub fn new(
        node: Arc<ContentNode>,
        content_type: Arc<ContentTypeDescriptor>,
        converters: Arc<ConverterRegistry>,
        scope: PropertyScope,
    ) -> Self {
        Self {
            node,
            content_type,
            converters,
            scope,
            properties: OnceCell::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn key(&self) -> Uuid {
        self.node.key
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn kind(&self) -> ItemKind {
        self.content_type.kind
    }

    pub fn node(&self) -> &Arc<ContentNode> {
        &self.node
    }

    pub fn content_type(&self) -> &Arc<ContentTypeDescriptor> {
        &self.content_type
    }

    pub fn is_preview(&self) -> bool {
        self.scope.preview
    }

    pub fn properties(&self) -> &[Arc<PublishedProperty>] {
        self.properties.get_or_init(|| {
            self.content_type
                .property_types
                .iter()
                .map(|property_type| {
                    Arc::new(PublishedProperty::new(
                        Arc::clone(&self.node),
                        property_type.clone(),
                        self.converters.converter_for(property_type),
                        self.scope.clone(),
                    ))
                })
                .collect()
        })
    }

    pub fn property(&self, alias: &str) -> Option<&Arc<PublishedProperty>> {
        self.properties()
            .iter()
            .find(|property| property.alias().eq_ignore_ascii_case(alias))
    }

    pub fn has_value(&self, alias: &str, culture: Option<&str>) -> bool {
        self.property(alias)
            .is_some_and(|property| property.has_value(culture))
    }

    /// Object value of a property, `None` when the type has no such property.
    pub fn value(
        &self,
        alias: &str,
        culture: Option<&str>,
    ) -> Result<Option<ConvertedValue>, PublishedCacheError> {
        self.property(alias)
            .map(|property| property.value(culture))
            .transpose()
    }

    /// Representation of a property read from a nested conversion at `reference`.
    pub fn value_at(
        &self,
        alias: &str,
        reference: CacheLevel,
        kind: ValueKind,
        culture: Option<&str>,
    ) -> Result<Option<(ConvertedValue, CacheLevel)>, PublishedCacheError> {
        self.property(alias)
            .map(|property| property.get_or_compute(reference, kind, culture))
            .transpose()
    }
}

impl std::fmt::Debug for PublishedContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishedContent")
            .field("id", &self.node.id)
            .field("content_type", &self.content_type.alias)
            .field("preview", &self.scope.preview)
            .finish()
    }
}
