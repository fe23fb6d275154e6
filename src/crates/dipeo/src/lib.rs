//! # dipeo — composition root
//!
//! This crate wires the four library crates (`dipeo-core`, `dipeo-runtime`,
//! `dipeo-events`, `dipeo-utils`) into a runnable CLI: it parses a diagram
//! file, compiles it, builds a [`dipeo_runtime::HandlerRegistry`] and a
//! [`dipeo_runtime::handler::ServiceRegistry`] from in-process stub
//! adapters, and drives the result through [`dipeo_runtime::Engine`].
//!
//! Nothing here is a reusable library surface in its own right — every
//! module exists to answer questions the library crates leave open on
//! purpose: where the bytes on disk, the LLM calls, and the process's
//! stdout actually come from.
//!
//! ## Modules
//!
//! - [`config`] — layered configuration (defaults → file → environment)
//! - [`error`] — `DipeoError`, the composition root's error type
//! - [`handlers`] — one [`dipeo_runtime::Handler`] per `NodeType`
//! - [`adapters`] — stub/in-process implementations of the service ports
//! - [`init`] — first-run directory/config bootstrap
//! - [`shutdown`] — signal handling and graceful cancellation
//! - [`cli`] — `compile` / `validate` / `run` subcommands
//! - [`version`] — build metadata injected by `build.rs`

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod init;
pub mod shutdown;
pub mod version;

pub use error::{DipeoError, Result};
pub use shutdown::ShutdownCoordinator;
pub use version::{full_version as version_info, short_version, VersionInfo};
