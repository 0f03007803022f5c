//! Cache key definitions.
//!
//! Type-cache alias keys, property slot keys and snapshot route keys.

use std::fmt;

use uuid::Uuid;

use crate::domain::content::{NodeId, culture_key};
use crate::domain::content_type::ItemKind;

/// Alias key of the type cache; aliases are unique per item kind only.
pub fn content_type_alias_key(kind: ItemKind, alias: &str) -> String {
    format!("{}::{}", kind.alias_prefix(), alias)
}

/// Key of a property slot in the elements and snapshot stores.
///
/// The preview flag is part of the key so draft and published values of the
/// same node never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyCacheKey {
    pub preview: bool,
    pub content_key: Uuid,
    pub alias: String,
}

impl PropertyCacheKey {
    pub fn new(preview: bool, content_key: Uuid, alias: impl Into<String>) -> Self {
        Self {
            preview,
            content_key,
            alias: alias.into(),
        }
    }
}

impl fmt::Display for PropertyCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.preview { 'D' } else { 'P' };
        write!(
            f,
            "PropertyCacheValues[{mode}:{}:{}]",
            self.content_key, self.alias
        )
    }
}

/// Snapshot route cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteCacheKey {
    /// Route → node lookup.
    ContentByRoute {
        route: String,
        hide_top_level_node: bool,
        culture: String,
    },
    /// Node → route lookup.
    RouteByContent {
        id: NodeId,
        hide_top_level_node: bool,
        culture: String,
    },
}

impl RouteCacheKey {
    pub fn content_by_route(route: &str, hide_top_level_node: bool, culture: Option<&str>) -> Self {
        Self::ContentByRoute {
            route: route.to_lowercase(),
            hide_top_level_node,
            culture: culture_key(culture),
        }
    }

    pub fn route_by_content(id: NodeId, hide_top_level_node: bool, culture: Option<&str>) -> Self {
        Self::RouteByContent {
            id,
            hide_top_level_node,
            culture: culture_key(culture),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_keys_are_partitioned_by_kind() {
        assert_ne!(
            content_type_alias_key(ItemKind::Media, "image"),
            content_type_alias_key(ItemKind::Member, "image")
        );
        assert_eq!(content_type_alias_key(ItemKind::Content, "page"), "c::page");
    }

    #[test]
    fn preview_flag_separates_property_keys() {
        let key = Uuid::nil();
        let published = PropertyCacheKey::new(false, key, "title");
        let draft = PropertyCacheKey::new(true, key, "title");
        assert_ne!(published, draft);
        assert_eq!(
            published.to_string(),
            "PropertyCacheValues[P:00000000-0000-0000-0000-000000000000:title]"
        );
        assert!(draft.to_string().starts_with("PropertyCacheValues[D:"));
    }

    #[test]
    fn route_keys_ignore_case() {
        assert_eq!(
            RouteCacheKey::content_by_route("/Foo/Bar", true, Some("en-US")),
            RouteCacheKey::content_by_route("/foo/bar", true, Some("en-us"))
        );
        assert_ne!(
            RouteCacheKey::content_by_route("/foo", true, None),
            RouteCacheKey::content_by_route("/foo", false, None)
        );
    }
}
