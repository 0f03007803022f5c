//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::router::DEFAULT_URL_ALIAS_PROPERTY;
use crate::domain::routing::AliasMatching;

mod cli;

pub use cli::{AliasArgs, CliArgs, Command, LookupArgs, LookupOverrides, RouteArgs, UrlArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "published-cache";
const ENV_PREFIX: &str = "PUBLISHED_CACHE";
const DEFAULT_ELEMENTS_CACHE_LIMIT: usize = 10_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub routing: RoutingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSettings {
    /// `None` defers to the content tree provider.
    pub hide_top_level_node: Option<bool>,
    pub url_alias_property: String,
    pub alias_matching: AliasMatching,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            hide_top_level_node: None,
            url_alias_property: DEFAULT_URL_ALIAS_PROPERTY.to_string(),
            alias_matching: AliasMatching::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub full_cache_when_previewing: bool,
    pub elements_cache_limit: NonZeroUsize,
    pub route_cache: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            full_cache_when_previewing: false,
            elements_cache_limit: NonZeroUsize::new(DEFAULT_ELEMENTS_CACHE_LIMIT)
                .unwrap_or(NonZeroUsize::MIN),
            route_cache: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_lookup_overrides(&cli.command.lookup().overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    routing: RawRoutingSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_lookup_overrides(&mut self, overrides: &LookupOverrides) {
        if let Some(hide) = overrides.hide_top_level_node {
            self.routing.hide_top_level_node = Some(hide);
        }
        if let Some(alias) = overrides.url_alias_property.as_ref() {
            self.routing.url_alias_property = Some(alias.clone());
        }
        if let Some(matching) = overrides.alias_matching.as_ref() {
            self.routing.alias_matching = Some(matching.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            routing,
            cache,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            routing: build_routing_settings(routing)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_routing_settings(routing: RawRoutingSettings) -> Result<RoutingSettings, LoadError> {
    let url_alias_property = match routing.url_alias_property {
        Some(alias) if alias.trim().is_empty() => {
            return Err(LoadError::invalid(
                "routing.url_alias_property",
                "must not be blank",
            ));
        }
        Some(alias) => alias.trim().to_string(),
        None => DEFAULT_URL_ALIAS_PROPERTY.to_string(),
    };

    let alias_matching = match routing.alias_matching {
        Some(mode) => parse_alias_matching(&mode)?,
        None => AliasMatching::default(),
    };

    Ok(RoutingSettings {
        hide_top_level_node: routing.hide_top_level_node,
        url_alias_property,
        alias_matching,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let elements_cache_limit = match cache.elements_cache_limit {
        Some(limit) => non_zero_usize(limit, "cache.elements_cache_limit")?,
        None => CacheSettings::default().elements_cache_limit,
    };

    Ok(CacheSettings {
        full_cache_when_previewing: cache.full_cache_when_previewing.unwrap_or(false),
        elements_cache_limit,
        route_cache: cache.route_cache.unwrap_or(true),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRoutingSettings {
    hide_top_level_node: Option<bool>,
    url_alias_property: Option<String>,
    alias_matching: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    full_cache_when_previewing: Option<bool>,
    elements_cache_limit: Option<u64>,
    route_cache: Option<bool>,
}

fn parse_alias_matching(value: &str) -> Result<AliasMatching, LoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "substring" => Ok(AliasMatching::Substring),
        "delimited" => Ok(AliasMatching::Delimited),
        other => Err(LoadError::invalid(
            "routing.alias_matching",
            format!("unknown mode `{other}`, expected substring or delimited"),
        )),
    }
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
