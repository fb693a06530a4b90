//! # bock-frontend
//!
//! Flag parsing for build instructions.
//!
//! Handles the `RUN` instruction's flags through an explicit, ordered list of
//! [`ParseExtension`]s, and the `--device` request grammar:
//!
//! ```
//! use bock_frontend::parse_device;
//!
//! let device = parse_device("nvidia.com/gpu=all,required").unwrap();
//! assert_eq!(device.name, "nvidia.com/gpu=all");
//! assert!(device.required);
//! ```

#![warn(missing_docs)]

pub mod device;
pub mod error;
mod fields;
pub mod qualified;
pub mod run;
pub mod suggest;

pub use device::{Device, DeviceExtension, parse_device};
pub use error::FrontendError;
pub use qualified::{QualifiedName, QualifiedNameError};
pub use run::{FlagSet, ParseExtension, RunCommand, RunParser};
