//! Test utilities for keel
//!
//! Helpers shared by unit and integration tests. The main export is
//! [`init_test_logging`], which wires a test-friendly tracing subscriber so
//! `RUST_LOG=debug cargo test` shows the engine's log flow inside captured
//! test output.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber at most once regardless of how many
/// times it's called. Respects the `RUST_LOG` environment variable when set,
/// or uses the provided log level.
///
/// # Arguments
///
/// * `level` - Optional log level to use. If None, uses `RUST_LOG`
///
/// # Example
///
/// ```rust,no_run
/// use tracing::Level;
///
/// // Use environment variable
/// keel::test_utils::init_test_logging(None);
///
/// // Or set level programmatically
/// keel::test_utils::init_test_logging(Some(Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = match level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => match EnvFilter::try_from_default_env() {
                Ok(filter) => filter,
                // Stay silent unless the test opts in.
                Err(_) => return,
            },
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
