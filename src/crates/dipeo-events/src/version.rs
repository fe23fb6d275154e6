// Version information module for dipeo-events
//
// Provides version constants for the dipeo-events crate

/// Version string for the dipeo-events crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
