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

    // Logs go to stderr so command output on stdout stays pipeable.
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

/// Register descriptions for every metric the cache emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "memfirst_cache_memory_hit_total",
            Unit::Count,
            "Total number of reads answered by the memory tier."
        );
        describe_counter!(
            "memfirst_cache_memory_miss_total",
            Unit::Count,
            "Total number of reads that fell through to the persistent tier."
        );
        describe_counter!(
            "memfirst_cache_backing_hit_total",
            Unit::Count,
            "Total number of fall-through reads answered by the persistent tier."
        );
        describe_counter!(
            "memfirst_cache_backing_miss_total",
            Unit::Count,
            "Total number of fall-through reads missing from the persistent tier."
        );
        describe_counter!(
            "memfirst_cache_backing_error_total",
            Unit::Count,
            "Total number of failed persistent tier operations."
        );
        describe_counter!(
            "memfirst_cache_memory_evict_total",
            Unit::Count,
            "Total number of memory tier evictions due to capacity."
        );
        describe_histogram!(
            "memfirst_cache_backing_ms",
            Unit::Milliseconds,
            "Persistent tier operation latency in milliseconds."
        );
    });
}
