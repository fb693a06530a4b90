//! # bock-common
//!
//! Shared types for the Bock build engine.
//!
//! This crate provides what every other Bock crate leans on:
//! - The common error type handed across crate boundaries
//! - Standard filesystem paths (data root, runtime dir, mount scratch space)

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{BockError, BockResult};
pub use paths::BockPaths;
