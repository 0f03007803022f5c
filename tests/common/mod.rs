#![allow(dead_code)]

use std::sync::Arc;

use published_cache::application::service::PublishedCacheService;
use published_cache::cache::ConverterRegistry;
use published_cache::config::Settings;
use published_cache::infra::memory::MemoryContentTree;
use serde_json::{Value, json};

pub const HOME: i32 = 1000;
pub const ABOUT: i32 = 1001;
pub const TEAM: i32 = 1002;
pub const FOO: i32 = 1003;
pub const ALIASED: i32 = 1004;
pub const DRAFT: i32 = 1006;
pub const BLANK: i32 = 1007;
pub const LANDING: i32 = 1100;
pub const PROMO: i32 = 1101;
pub const SITE: i32 = 123;
pub const SITE_A: i32 = 124;
pub const SITE_B: i32 = 125;
pub const GLOBAL: i32 = 1200;
pub const NEWS: i32 = 1201;

/// Four top-level nodes: an invariant site, a second invariant root, a root
/// with an assigned domain and a culture-variant root.
pub fn site_fixture() -> Value {
    json!({
        "content_types": [
            { "id": 1044, "alias": "page", "kind": "content",
              "property_types": [
                { "alias": "title", "data_type_id": -88, "cache_level": "element" },
                { "alias": "umbracoUrlAlias", "data_type_id": -88, "cache_level": "snapshot" }
              ] },
            { "id": 1045, "alias": "article", "kind": "content",
              "property_types": [
                { "alias": "title", "data_type_id": -88, "cache_level": "elements",
                  "varies_by_culture": true },
                { "alias": "umbracoUrlAlias", "data_type_id": -88, "varies_by_culture": true }
              ] }
        ],
        "domains": [{ "node_id": SITE, "name": "example.org", "culture": "en-US" }],
        "nodes": [
            { "id": HOME, "name": "Home", "content_type": "page",
              "properties": { "title": "Welcome" } },
            { "id": ABOUT, "parent_id": HOME, "name": "About", "content_type": "page" },
            { "id": TEAM, "parent_id": ABOUT, "name": "Team", "content_type": "page" },
            { "id": FOO, "parent_id": HOME, "name": "Foo", "content_type": "page" },
            { "id": ALIASED, "parent_id": HOME, "name": "Aliased", "content_type": "page",
              "properties": { "umbracoUrlAlias": "foo/bar, /foo/nil" } },
            { "id": DRAFT, "parent_id": HOME, "name": "Draft", "content_type": "page",
              "published": false },
            { "id": BLANK, "parent_id": HOME, "name": "Blank", "content_type": "page",
              "segment": "   " },
            { "id": LANDING, "name": "Landing", "content_type": "page",
              "properties": { "umbracoUrlAlias": "landing-alias" } },
            { "id": PROMO, "parent_id": LANDING, "name": "Promo", "content_type": "page",
              "properties": { "umbracoUrlAlias": "barfoo" } },
            { "id": SITE, "name": "Site", "content_type": "page" },
            { "id": SITE_A, "parent_id": SITE, "name": "A", "content_type": "page" },
            { "id": SITE_B, "parent_id": SITE_A, "name": "B", "content_type": "page" },
            { "id": GLOBAL, "name": "Global", "content_type": "article",
              "segments": { "en-US": "global", "fr-FR": "mondial" },
              "cultures": ["en-US", "fr-FR"],
              "properties": { "title": { "en-US": "Global", "fr-FR": "Mondial" } } },
            { "id": NEWS, "parent_id": GLOBAL, "name": "News", "content_type": "article",
              "segments": { "en-US": "news" },
              "cultures": ["en-US"],
              "properties": { "umbracoUrlAlias": { "en-US": "latest" } } }
        ]
    })
}

pub fn site_tree() -> Arc<MemoryContentTree> {
    Arc::new(MemoryContentTree::from_value(site_fixture()).expect("site fixture"))
}

pub fn service_with(settings: &Settings, tree: Arc<MemoryContentTree>) -> PublishedCacheService {
    PublishedCacheService::new(settings, tree.clone(), tree, ConverterRegistry::new())
}

pub fn site_service() -> PublishedCacheService {
    service_with(&Settings::default(), site_tree())
}

pub const ALL_NODES: [i32; 14] = [
    HOME, ABOUT, TEAM, FOO, ALIASED, DRAFT, BLANK, LANDING, PROMO, SITE, SITE_A, SITE_B, GLOBAL,
    NEWS,
];
