//! # bock-runtime
//!
//! Command line access to the Bock build-step machinery:
//! - Mount a snapshot around a command, the way a build step sees it
//! - Check `RUN` flags and `--device` requests
//! - Inspect the effective mounter configuration

#![warn(missing_docs)]

pub mod cli;
