//! Shared helpers for replication integration tests.

use std::sync::Once;

static TRACING: Once = Once::new();

/// Send log output to the test harness. Debug level keeps ping replies
/// shallow unless a test turns detailed pings on.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}
