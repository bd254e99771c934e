//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::settings::LoggingSettings;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` when a
/// global subscriber was already installed, which is common in tests.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install the subscriber from the `[logging]` settings section.
pub fn init_from_settings(settings: &LoggingSettings) -> bool {
    init_tracing(&settings.filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_rejected() {
        // Another test may already have installed a subscriber.
        let _ = init_tracing("panorama=debug");
        assert!(!init_from_settings(&LoggingSettings::default()));
    }
}
