//! Log filter selection for the binary.

use tracing_subscriber::EnvFilter;

const QUIET_TARGETS: &str = "hyper=warn,reqwest=warn";
const DEFAULT_LEVEL: &str = "info";

/// The requested filter directive: `GARMIN_DIVES_LOG_LEVEL`, then `RUST_LOG`,
/// then `info`.
pub fn log_directive<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut lookup = |key: &str| get(key).filter(|v| !v.trim().is_empty());
    lookup("GARMIN_DIVES_LOG_LEVEL")
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Build the filter for `directive` with HTTP internals kept at `warn`.
/// An unparsable directive falls back to `info`.
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(format!("{directive},{QUIET_TARGETS}"))
        .unwrap_or_else(|_| EnvFilter::new(format!("{DEFAULT_LEVEL},{QUIET_TARGETS}")))
}
