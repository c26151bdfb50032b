// Logging setup shared by binaries and integration harnesses
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,henhouse_core=info,researcher=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a subscriber was already installed (e.g. by a test).
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
