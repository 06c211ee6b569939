use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a subscriber that prints library logs, including wire traffic at the trace level,
/// into the output captured by the test harness.
pub fn setup_test_environment() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing_core::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_line_number(true)
            .init();
    });
}
