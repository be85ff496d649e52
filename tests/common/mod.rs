//! Shared helpers for integration tests.

pub mod stubs;

/// Initializes test logging once; safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
