use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "shopfront_cache_lookup_hit_total",
            Unit::Count,
            "Total number of lookups served from the cached collection."
        );
        describe_counter!(
            "shopfront_cache_lookup_miss_total",
            Unit::Count,
            "Total number of lookups whose slug was absent from the cached collection."
        );
        describe_counter!(
            "shopfront_cache_lookup_stale_total",
            Unit::Count,
            "Total number of lookups withheld because the cached collection aged out."
        );
        describe_counter!(
            "shopfront_cache_lookup_empty_total",
            Unit::Count,
            "Total number of lookups finding no valid cached collection."
        );
        describe_counter!(
            "shopfront_cache_rebuild_total",
            Unit::Count,
            "Total number of completed full-collection rebuilds."
        );
        describe_histogram!(
            "shopfront_cache_warm_ms",
            Unit::Milliseconds,
            "Catalog warm latency in milliseconds."
        );
    });
}
