//! Published content nodes as handed out by a tree provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::content_type::{ContentTypeDescriptor, ItemKind};

pub type NodeId = i32;

/// Culture key under which invariant segments and values are stored.
pub const INVARIANT_CULTURE: &str = "";

/// Normalise an optional culture into a map key.
pub fn culture_key(culture: Option<&str>) -> String {
    culture
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Raw stored values of one property, keyed by culture.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyData {
    values: BTreeMap<String, Value>,
}

impl PropertyData {
    pub fn invariant(value: Value) -> Self {
        let mut data = Self::default();
        data.set(None, value);
        data
    }

    pub fn set(&mut self, culture: Option<&str>, value: Value) {
        self.values.insert(culture_key(culture), value);
    }

    pub fn get(&self, culture: Option<&str>) -> Option<&Value> {
        self.values.get(&culture_key(culture))
    }

    pub fn cultures(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// A node of the published content tree.
///
/// Nodes are owned by the tree provider. The parent is referenced by id and
/// resolved through the provider; children are never held here.
#[derive(Debug, Clone)]
pub struct ContentNode {
    pub id: NodeId,
    pub key: Uuid,
    pub parent_id: Option<NodeId>,
    pub level: u32,
    pub sort_order: i32,
    pub name: String,
    pub content_type: Arc<ContentTypeDescriptor>,
    pub url_segments: BTreeMap<String, String>,
    pub cultures: Vec<String>,
    pub properties: BTreeMap<String, PropertyData>,
}

impl ContentNode {
    pub fn new(id: NodeId, name: impl Into<String>, content_type: Arc<ContentTypeDescriptor>) -> Self {
        Self {
            id,
            key: Uuid::new_v4(),
            parent_id: None,
            level: 1,
            sort_order: 0,
            name: name.into(),
            content_type,
            url_segments: BTreeMap::new(),
            cultures: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, key: Uuid) -> Self {
        self.key = key;
        self
    }

    pub fn under(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn segment(mut self, culture: Option<&str>, segment: impl Into<String>) -> Self {
        self.url_segments.insert(culture_key(culture), segment.into());
        self
    }

    pub fn culture(mut self, culture: &str) -> Self {
        self.cultures.push(culture_key(Some(culture)));
        self
    }

    pub fn property(mut self, alias: &str, culture: Option<&str>, value: Value) -> Self {
        self.properties
            .entry(alias.to_string())
            .or_default()
            .set(culture, value);
        self
    }

    pub fn kind(&self) -> ItemKind {
        self.content_type.kind
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// URL segment for the culture, falling back to the invariant segment.
    pub fn url_segment(&self, culture: Option<&str>) -> Option<&str> {
        let key = culture_key(culture);
        self.url_segments
            .get(&key)
            .or_else(|| self.url_segments.get(INVARIANT_CULTURE))
            .map(String::as_str)
    }

    pub fn has_culture(&self, culture: Option<&str>) -> bool {
        let key = culture_key(culture);
        self.cultures.iter().any(|value| *value == key)
    }

    pub fn raw_value(&self, alias: &str, culture: Option<&str>) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias))
            .and_then(|(_, data)| data.get(culture))
    }

    pub fn property_data(&self, alias: &str) -> Option<&PropertyData> {
        self.properties
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(alias))
            .map(|(_, data)| data)
    }
}
