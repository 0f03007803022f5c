use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::service::METRIC_NOTIFY_MS;
use crate::application::snapshot::{METRIC_ROUTE_CACHE_HIT, METRIC_ROUTE_CACHE_MISS};
use crate::cache::metric_names::{
    METRIC_CONTENT_TYPE_HIT, METRIC_CONTENT_TYPE_MISS, METRIC_ELEMENTS_LEN, METRIC_PROPERTY_CONVERT,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Log lines go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CONTENT_TYPE_HIT,
            Unit::Count,
            "Total number of content type cache hits."
        );
        describe_counter!(
            METRIC_CONTENT_TYPE_MISS,
            Unit::Count,
            "Total number of content type cache misses served by the type source."
        );
        describe_counter!(
            METRIC_PROPERTY_CONVERT,
            Unit::Count,
            "Total number of property object and xpath conversions."
        );
        describe_counter!(
            METRIC_ROUTE_CACHE_HIT,
            Unit::Count,
            "Total number of route lookups answered from a snapshot memo."
        );
        describe_counter!(
            METRIC_ROUTE_CACHE_MISS,
            Unit::Count,
            "Total number of route lookups computed by the router."
        );
        describe_gauge!(
            METRIC_ELEMENTS_LEN,
            Unit::Count,
            "Current number of property slots in the elements store."
        );
        describe_histogram!(
            METRIC_NOTIFY_MS,
            Unit::Milliseconds,
            "Latency of applying cache notifications in milliseconds."
        );
    });
}
