//! Tracing init helper shared by the `dipeo` binary and its tests.
//!
//! Grounded on `orca::bin::orca`'s `tracing_subscriber::fmt::init()` call,
//! generalized into a reusable function that takes an `EnvFilter` directive
//! instead of always reading `RUST_LOG` implicitly, so callers (and tests)
//! can pin a level without touching the process environment.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive used when neither a caller-supplied directive
/// nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "info";

/// Install a global `tracing` subscriber with the given filter directive,
/// falling back to `RUST_LOG` and then [`DEFAULT_FILTER`].
///
/// Safe to call once per process; a second call returns an error rather
/// than panicking, mirroring `tracing::subscriber::set_global_default`.
pub fn init_tracing(directive: Option<&str>) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = directive
        .map(String::from)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());

    fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init()
}
