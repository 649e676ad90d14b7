//! Tracing subscriber setup for the `mirror` binary.
//!
//! Logs go to stderr; stdout is reserved for command output. `RUST_LOG`,
//! when set, overrides `[logging].level`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
        _ => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    let _ = result;
}

/// Scope the configured level to this crate so dependencies stay quiet.
fn default_directive(level: &str) -> String {
    format!("repo_mirror={},mirror={},warn", level, level)
}
