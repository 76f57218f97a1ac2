//! Tracing subscriber for `SiteGate` binaries.
//!
//! Logs always go to stderr: the harness keeps stdout for its JSON snapshot.
//! Without `RUST_LOG`, the configured level applies to the `SiteGate` crates
//! and everything else logs at `warn`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

const CRATES: [&str; 3] = ["sitegate_popup", "sitegate_core", "sitegate_proto"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

fn build_filter(rust_log: Option<&str>, logging: &LoggingConfig) -> Result<EnvFilter> {
    let directives = rust_log.map_or_else(|| default_directives(&logging.level), str::to_string);
    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter {directives:?}: {e}")))
}

/// Install the global subscriber from the `logging` config section.
///
/// Fails on a level that does not parse, or if a subscriber is already set.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), logging)?;
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if logging.json {
        registry.with(fmt.json()).try_init()
    } else {
        registry.with(fmt).try_init()
    };
    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn logging(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            json: false,
        }
    }

    #[test]
    fn level_applies_to_sitegate_crates_only() {
        assert_eq!(
            default_directives("debug"),
            "warn,sitegate_popup=debug,sitegate_core=debug,sitegate_proto=debug"
        );
    }

    #[test]
    fn rust_log_replaces_configured_level() {
        let filter = build_filter(Some("sitegate_popup=trace"), &logging("loud")).unwrap();
        assert!(filter.to_string().contains("sitegate_popup=trace"));
    }

    #[test]
    fn unknown_level_is_a_config_error() {
        let err = build_filter(None, &logging("loud")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
