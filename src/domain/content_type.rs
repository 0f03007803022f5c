//! Content-type schema descriptors consumed by the published cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cache_level::CacheLevel;
use super::error::DomainError;

/// Partition of the content-type alias namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Content,
    Media,
    Member,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Content => "content",
            ItemKind::Media => "media",
            ItemKind::Member => "member",
        }
    }

    /// Prefix used to partition alias keys in the type cache.
    pub fn alias_prefix(self) -> &'static str {
        match self {
            ItemKind::Content => "c",
            ItemKind::Media => "m",
            ItemKind::Member => "r",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(ItemKind::Content),
            "media" => Ok(ItemKind::Media),
            "member" => Ok(ItemKind::Member),
            _ => Err(DomainError::UnknownItemKind {
                value: s.to_string(),
            }),
        }
    }
}

/// A property type as embedded in its content type, inherited properties included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTypeDescriptor {
    pub alias: String,
    pub data_type_id: i32,
    #[serde(default)]
    pub editor_alias: String,
    #[serde(default = "default_cache_level")]
    pub cache_level: CacheLevel,
    #[serde(default)]
    pub varies_by_culture: bool,
}

fn default_cache_level() -> CacheLevel {
    CacheLevel::Element
}

impl PropertyTypeDescriptor {
    pub fn new(alias: impl Into<String>, data_type_id: i32, cache_level: CacheLevel) -> Self {
        Self {
            alias: alias.into(),
            data_type_id,
            editor_alias: String::new(),
            cache_level,
            varies_by_culture: false,
        }
    }

    /// Build from a numeric level coming from the schema store, rejecting unknown levels.
    pub fn with_raw_level(
        alias: impl Into<String>,
        data_type_id: i32,
        raw_level: i32,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(alias, data_type_id, CacheLevel::try_from(raw_level)?))
    }

    pub fn editor(mut self, editor_alias: impl Into<String>) -> Self {
        self.editor_alias = editor_alias.into();
        self
    }

    pub fn culture_variant(mut self) -> Self {
        self.varies_by_culture = true;
        self
    }
}

/// Immutable schema of a content, media or member type.
///
/// Instances are shared through `Arc` and replaced wholesale on invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeDescriptor {
    pub id: i32,
    pub alias: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub property_types: Vec<PropertyTypeDescriptor>,
}

impl ContentTypeDescriptor {
    pub fn new(id: i32, alias: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            alias: alias.into(),
            kind,
            property_types: Vec::new(),
        }
    }

    pub fn with_property(mut self, property_type: PropertyTypeDescriptor) -> Self {
        self.property_types.push(property_type);
        self
    }

    pub fn property_type(&self, alias: &str) -> Option<&PropertyTypeDescriptor> {
        self.property_types
            .iter()
            .find(|property| property.alias.eq_ignore_ascii_case(alias))
    }

    pub fn uses_data_type(&self, data_type_id: i32) -> bool {
        self.property_types
            .iter()
            .any(|property| property.data_type_id == data_type_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_lookup_ignores_case() {
        let descriptor = ContentTypeDescriptor::new(1050, "page", ItemKind::Content)
            .with_property(PropertyTypeDescriptor::new("umbracoUrlAlias", 12, CacheLevel::Element));

        assert!(descriptor.property_type("UMBRACOURLALIAS").is_some());
        assert!(descriptor.property_type("title").is_none());
        assert!(descriptor.uses_data_type(12));
        assert!(!descriptor.uses_data_type(13));
    }

    #[test]
    fn raw_levels_are_validated_eagerly() {
        let property = PropertyTypeDescriptor::with_raw_level("body", 3, 3).expect("valid");
        assert_eq!(property.cache_level, CacheLevel::Snapshot);

        let err = PropertyTypeDescriptor::with_raw_level("body", 3, 9).expect_err("invalid");
        assert!(matches!(err, DomainError::InvalidCacheLevel { .. }));
    }

    #[test]
    fn kinds_have_distinct_alias_prefixes() {
        assert_ne!(ItemKind::Media.alias_prefix(), ItemKind::Member.alias_prefix());
        assert_ne!(ItemKind::Content.alias_prefix(), ItemKind::Media.alias_prefix());
        assert_eq!("Media".parse::<ItemKind>().expect("kind"), ItemKind::Media);
    }
}
