//! Opt-in log output for hosts.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr subscriber filtered by `RUST_LOG`.
/// Returns `false` when a global subscriber is already set.
#[no_mangle]
pub extern "C" fn opalink_init_logging() -> bool {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
