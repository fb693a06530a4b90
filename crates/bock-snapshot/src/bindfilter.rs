//! Bind emulation.
//!
//! The local mounter never issues bind mounts itself; it asks a [`BindFilter`]
//! to make one directory reflect another. On Linux this is a plain kernel
//! bind mount, other hosts plug in their own filter driver.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors reported by a [`BindFilter`].
#[derive(Error, Debug)]
pub enum BindError {
    /// The target exists but nothing is bound on it.
    #[error("{} is not a mount point", path.display())]
    NotMounted {
        /// The target that was inspected.
        path: PathBuf,
    },

    /// No binding is registered for the target.
    #[error("no binding found for {}", path.display())]
    NotFound {
        /// The target that was inspected.
        path: PathBuf,
    },

    /// Anything else.
    #[error(transparent)]
    Failed(#[from] io::Error),
}

impl BindError {
    /// Whether this error only says the target was not bound in the first place.
    #[must_use]
    pub fn is_not_bound(&self) -> bool {
        matches!(self, Self::NotMounted { .. } | Self::NotFound { .. })
    }
}

/// Establishes and removes bindings between directories.
///
/// Both operations are atomic from the caller's point of view; any retrying
/// happens inside the implementation.
pub trait BindFilter: Send + Sync {
    /// Make `target` reflect `source`, optionally read-only.
    fn apply_binding(&self, target: &Path, source: &Path, read_only: bool)
    -> Result<(), BindError>;

    /// Remove the binding on `target`.
    ///
    /// Must report [`BindError::NotMounted`] or [`BindError::NotFound`] when
    /// `target` carries no binding.
    fn remove_binding(&self, target: &Path) -> Result<(), BindError>;
}

/// [`BindFilter`] built on kernel bind mounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelBindFilter;

#[cfg(target_os = "linux")]
impl BindFilter for KernelBindFilter {
    fn apply_binding(
        &self,
        target: &Path,
        source: &Path,
        read_only: bool,
    ) -> Result<(), BindError> {
        use rustix::mount::{MountFlags, MountPropagationFlags, mount_change, mount_remount};

        tracing::debug!(
            source = %source.display(),
            target = %target.display(),
            read_only,
            "Creating bind mount"
        );

        bind_then(source, target, || {
            // Keep the binding from leaking into peer namespaces
            mount_change(target, MountPropagationFlags::PRIVATE)?;
            if read_only {
                mount_remount(target, MountFlags::BIND | MountFlags::RDONLY, c"")?;
            }
            Ok(())
        })
    }

    fn remove_binding(&self, target: &Path) -> Result<(), BindError> {
        use rustix::io::Errno;
        use rustix::mount::{UnmountFlags, unmount};

        tracing::debug!(target = %target.display(), "Removing bind mount");

        match unmount(target, UnmountFlags::empty()) {
            Ok(()) => Ok(()),
            Err(e) if e == Errno::INVAL => Err(BindError::NotMounted {
                path: target.to_path_buf(),
            }),
            Err(e) if e == Errno::NOENT => Err(BindError::NotFound {
                path: target.to_path_buf(),
            }),
            Err(e) => Err(BindError::Failed(e.into())),
        }
    }
}

/// Bind `source` onto `target`, then run `finish` on the new mount.
///
/// If `finish` fails the bind is detached again, so a failed call leaves
/// nothing attached at `target`.
#[cfg(target_os = "linux")]
fn bind_then<F>(source: &Path, target: &Path, finish: F) -> Result<(), BindError>
where
    F: FnOnce() -> rustix::io::Result<()>,
{
    use rustix::mount::{UnmountFlags, mount_bind, unmount};

    mount_bind(source, target).map_err(io::Error::from)?;

    if let Err(err) = finish() {
        if let Err(undo) = unmount(target, UnmountFlags::DETACH) {
            tracing::warn!(
                target = %target.display(),
                error = %undo,
                "Failed to detach partially applied bind mount"
            );
        }
        return Err(BindError::Failed(err.into()));
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
impl BindFilter for KernelBindFilter {
    fn apply_binding(
        &self,
        _target: &Path,
        _source: &Path,
        _read_only: bool,
    ) -> Result<(), BindError> {
        Err(BindError::Failed(io::Error::new(
            io::ErrorKind::Unsupported,
            "bind mounts are only supported on Linux",
        )))
    }

    fn remove_binding(&self, _target: &Path) -> Result<(), BindError> {
        Err(BindError::Failed(io::Error::new(
            io::ErrorKind::Unsupported,
            "bind mounts are only supported on Linux",
        )))
    }
}
