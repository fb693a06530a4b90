//! # bock-snapshot
//!
//! Turns abstract snapshot mounts into a directory on disk and tears that
//! mapping down again.
//!
//! The storage layer hands out an ordered list of [`Mount`] descriptors
//! through a [`Mountable`] provider. [`LocalMounter`] resolves them once,
//! materializes the single supported mount on a scratch directory and undoes
//! the work on [`LocalMounter::unmount`].
//!
//! ## Usage
//!
//! ```no_run
//! use bock_snapshot::{LocalMounter, Mount};
//!
//! # fn example() -> Result<(), bock_snapshot::MountError> {
//! let mounter = LocalMounter::with_mounts(vec![Mount::from_parts(
//!     "bind",
//!     "/var/lib/bock/snapshots/42/fs",
//!     vec!["ro".to_string()],
//! )]);
//!
//! let root = mounter.mount()?;
//! println!("snapshot available at {}", root.display());
//! mounter.unmount()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bindfilter;
pub mod config;
pub mod error;
pub mod local;
pub mod mount;
pub mod mountable;
pub mod retry;

pub use bindfilter::{BindError, BindFilter, KernelBindFilter};
pub use config::MounterConfig;
pub use error::MountError;
pub use local::LocalMounter;
pub use mount::{Mount, MountKind, NativeMounter, SystemMounter};
pub use mountable::{Mountable, Release, StaticMountable};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper, mount_with_retries};
