//! Process-wide logging setup for the test vector runner.
//!
//! Library crates only use the `log` facade; binaries and tests call one of
//! the `setup*` functions once to install `env_logger` as the backend.

use env_logger::{Builder, Env};

/// Default filter used when neither `RUST_LOG` nor an explicit filter is set.
pub const DEFAULT_FILTER: &str = "info";

/// Install the logger with [`DEFAULT_FILTER`], honouring `RUST_LOG`.
pub fn setup() {
    setup_with_default(DEFAULT_FILTER);
}

/// Install the logger with `filter`, ignoring `RUST_LOG`.
pub fn setup_with(filter: &str) {
    let mut builder = Builder::new();
    builder.parse_filters(filter);
    init(builder);
}

/// Install the logger using `RUST_LOG` if set, otherwise `filter`.
pub fn setup_with_default(filter: &str) {
    init(Builder::from_env(Env::new().default_filter_or(filter)));
}

/// Logger for unit and integration tests: captured by the test harness,
/// `info` unless `RUST_LOG` says otherwise.
pub fn setup_for_tests() {
    let _ = Builder::from_env(Env::new().default_filter_or(DEFAULT_FILTER))
        .is_test(true)
        .try_init();
}

fn init(mut builder: Builder) {
    builder.format_timestamp_millis();
    // A second setup call (e.g. from several tests) keeps the first logger.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_is_reentrant() {
        setup_for_tests();
        setup_with("debug");
        setup();
    }
}
