//! Diagnostics utilities: structured logging, metrics sinks, and error trailers.

mod logger;
mod metrics;
mod trailer;

pub use logger::{
    init_logging_with_default, log_stream_config_error, set_config_fingerprint, with_error_code,
};
pub use metrics::{
    install_metrics, record_constraint_rejected, record_lookup_miss, record_query,
    StreamConfigMetrics,
};
pub use trailer::emit_error_trailer;

#[cfg(test)]
pub use metrics::test_support;
#[cfg(test)]
pub use trailer::set_error_trailer_writer_for_tests;

use crate::policy::StreamConfigPolicy;

/// Suggested filter for embedders calling `init_logging_with_default`.
pub const DEFAULT_LOG_FILTER: &str = "event_stream_config=info";

/// Push log level, log file and trailer settings to the installed sinks.
pub fn apply_policy(policy: &StreamConfigPolicy) {
    logger::apply_logger_policy(policy);
    trailer::set_json_errors_enabled(policy.json_errors);
}
