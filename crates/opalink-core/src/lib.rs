//! opalink core: source loading, compilation, and the prepared-query registry.
//!
//! This crate holds everything the C boundary exposes, expressed as a plain
//! Rust API. It carries no FFI or `unsafe` code so it can be embedded directly
//! by Rust hosts and exercised by ordinary tests.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `OpaLinkError`/`Result` so a host process
//! never goes down because of a bad policy or malformed input.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod artifact;
pub mod compiler;
pub mod config;
pub mod error;
pub mod eval;
pub mod filter;
pub mod loader;
pub mod registry;

pub use artifact::Artifact;
pub use compiler::{build, build_from_manifest, compile_module, compile_standalone, prepare_artifact};
pub use config::BuildManifest;
/// Shared result type.
pub use error::{ErrorCode, OpaLinkError, Result};
pub use eval::{ExpressionValue, PreparedQuery, ResultEntry};
pub use filter::{IgnoreSet, NoFilter, PathFilter};
pub use loader::{load, SourceSet};
pub use registry::{Handle, Registry};

/// Engine value model (null, bool, number, string, array, set, object).
pub use regorus::Value;
