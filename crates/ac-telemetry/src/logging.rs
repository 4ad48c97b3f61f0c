use tracing_subscriber::{fmt, EnvFilter};

/// Output format for [`init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse the `general.log_format` config value. Unknown values fall back
    /// to [`LogFormat::Pretty`].
    pub fn from_config(value: &str) -> Self {
        match value {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize logging in the requested format.
pub fn init(service_name: &str, default_level: &str, format: LogFormat) {
    match format {
        LogFormat::Pretty => init_logging(service_name, default_level),
        LogFormat::Json => init_logging_json(service_name, default_level),
    }
}

/// Initialize logging with human-readable output format.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise falls back
/// to `default_level` (e.g. "info", "debug", "ac_agents=debug,warn").
///
/// Safe to call multiple times (e.g. in tests) -- subsequent calls are no-ops.
pub fn init_logging(service_name: &str, default_level: &str) {
    fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised (human-readable)");
}

/// Initialize logging with JSON output format.
///
/// Safe to call multiple times -- subsequent calls are no-ops.
pub fn init_logging_json(service_name: &str, default_level: &str) {
    fmt()
        .json()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .try_init()
        .ok();

    tracing::info!(service = service_name, "logging initialised (json)");
}

/// Initialize a test-friendly subscriber that writes through the test
/// harness capture. Repeated calls are no-ops.
pub fn init_test_logging() {
    fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init()
        .ok();
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
