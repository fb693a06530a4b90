//! Mount lifecycle errors.

use std::path::PathBuf;

use bock_common::BockError;
use miette::Diagnostic;
use thiserror::Error;

use crate::bindfilter::BindError;

/// Errors returned by [`LocalMounter`](crate::LocalMounter).
#[derive(Error, Diagnostic, Debug)]
pub enum MountError {
    /// The snapshot resolved to a layer count other than one.
    #[error("request to mount {count} layers, only 1 is supported")]
    #[diagnostic(
        code(bock::snapshot::not_implemented),
        help("Collapse stacked layers into a single mount before handing them to the local mounter")
    )]
    NotImplemented {
        /// Number of mounts the provider produced.
        count: usize,
    },

    /// The provider failed to produce mounts.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(BockError),

    /// The scratch mount point could not be created.
    #[error("failed to create temp dir in {}", root.display())]
    #[diagnostic(code(bock::snapshot::temp_dir))]
    TempDir {
        /// Directory the mount point was to be created in.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Native mount failed.
    #[error("failed to mount {mount} at {}", target.display())]
    #[diagnostic(code(bock::snapshot::mount))]
    Mount {
        /// Descriptor being mounted.
        mount: String,
        /// Mount point.
        target: PathBuf,
        /// Last error reported by the kernel.
        #[source]
        source: std::io::Error,
    },

    /// Establishing a bind failed.
    #[error("failed to mount {mount} at {}", target.display())]
    #[diagnostic(code(bock::snapshot::bind))]
    Bind {
        /// Descriptor being bound.
        mount: String,
        /// Mount point.
        target: PathBuf,
        /// Bind filter error.
        #[source]
        source: BindError,
    },

    /// Native unmount failed.
    #[error("failed to unmount {}", target.display())]
    #[diagnostic(code(bock::snapshot::unmount))]
    Unmount {
        /// Mount point.
        target: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Removing a bind failed for a reason other than the target not being bound.
    #[error("failed to unmount {}", target.display())]
    #[diagnostic(code(bock::snapshot::unbind))]
    Unbind {
        /// Mount point.
        target: PathBuf,
        /// Bind filter error.
        #[source]
        source: BindError,
    },

    /// The provider could not release the snapshot.
    #[error("failed to release snapshot mounts")]
    #[diagnostic(code(bock::snapshot::release))]
    Release(#[source] BockError),
}
