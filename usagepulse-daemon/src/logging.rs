//! Logging bootstrap.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use usagepulse_store::LogLevel;

/// Builds the default filter directive for `level`.
///
/// UsagePulse crates log at `level`; everything else at `warn`.
pub fn default_directive(level: LogLevel) -> String {
    format!("usagepulse={level},warn")
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns false if a
/// subscriber was already installed.
pub fn init_logging(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(LogLevel::Debug), "usagepulse=debug,warn");
    }

    #[test]
    fn test_second_init_is_rejected() {
        let _ = init_logging(LogLevel::Info);
        assert!(!init_logging(LogLevel::Trace));
    }
}
