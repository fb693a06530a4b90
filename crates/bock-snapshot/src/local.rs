//! Local mounter: materializes a snapshot on a directory of the host.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::bindfilter::{BindFilter, KernelBindFilter};
use crate::config::MounterConfig;
use crate::error::MountError;
use crate::mount::{Mount, MountKind, NativeMounter, SystemMounter};
use crate::mountable::{Mountable, Release};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper, mount_with_retries};

/// Resolution state of the provider's mounts.
enum Resolution {
    Unresolved,
    Resolved {
        mounts: Vec<Mount>,
        release: Option<Release>,
    },
}

impl Resolution {
    fn mounts(&self) -> &[Mount] {
        match self {
            Self::Unresolved => &[],
            Self::Resolved { mounts, .. } => mounts,
        }
    }

    /// The only mount; stacked layers cannot be composed here.
    fn single(&self) -> Result<&Mount, MountError> {
        match self.mounts() {
            [mount] => Ok(mount),
            mounts => Err(MountError::NotImplemented {
                count: mounts.len(),
            }),
        }
    }
}

struct State {
    resolution: Resolution,
    /// Scratch mount point that still needs teardown.
    target: Option<PathBuf>,
}

/// Mounts one snapshot on a local directory for the duration of a build step.
///
/// The host can only attach a single filesystem at a location, so the
/// provider must resolve to exactly one mount. `mount` and `unmount` are
/// serialized per instance; the provider is resolved at most once.
pub struct LocalMounter {
    mountable: Option<Box<dyn Mountable>>,
    state: Mutex<State>,
    bind_filter: Box<dyn BindFilter>,
    native: Box<dyn NativeMounter>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
    temp_root: PathBuf,
    temp_prefix: String,
}

impl LocalMounter {
    /// Create a mounter that resolves `mountable` on first use.
    pub fn new(mountable: impl Mountable + 'static) -> Self {
        Self::build(Some(Box::new(mountable)), Resolution::Unresolved)
    }

    /// Create a mounter over already resolved mounts, with nothing to release.
    #[must_use]
    pub fn with_mounts(mounts: Vec<Mount>) -> Self {
        Self::build(
            None,
            Resolution::Resolved {
                mounts,
                release: None,
            },
        )
    }

    fn build(mountable: Option<Box<dyn Mountable>>, resolution: Resolution) -> Self {
        let config = MounterConfig::default();
        Self {
            mountable,
            state: Mutex::new(State {
                resolution,
                target: None,
            }),
            bind_filter: Box::new(KernelBindFilter),
            native: Box::new(SystemMounter),
            sleeper: Box::new(ThreadSleeper),
            retry: config.retry_policy(),
            temp_root: config.temp_root(),
            temp_prefix: config.temp_prefix,
        }
    }

    /// Apply retry and scratch directory settings.
    #[must_use]
    pub fn with_config(mut self, config: &MounterConfig) -> Self {
        self.retry = config.retry_policy();
        self.temp_root = config.temp_root();
        self.temp_prefix = config.temp_prefix.clone();
        self
    }

    /// Use a different bind filter.
    #[must_use]
    pub fn with_bind_filter(mut self, bind_filter: impl BindFilter + 'static) -> Self {
        self.bind_filter = Box::new(bind_filter);
        self
    }

    /// Use a different native mount backend.
    #[must_use]
    pub fn with_native_mounter(mut self, native: impl NativeMounter + 'static) -> Self {
        self.native = Box::new(native);
        self
    }

    /// Use a different sleeper between busy retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Set the busy retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create scratch mount points under `root`.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    /// The active mount point, if one is waiting for teardown.
    #[must_use]
    pub fn target(&self) -> Option<PathBuf> {
        self.state.lock().target.clone()
    }

    /// Whether the provider has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state.lock().resolution, Resolution::Resolved { .. })
    }

    /// Mount the snapshot and return the directory it is reachable at.
    ///
    /// A writable bind resolves to its source path directly, no scratch
    /// directory is involved.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::NotImplemented`] unless exactly one mount was
    /// resolved. Provider, scratch directory and mount failures are returned
    /// as is; a failed mount leaves its scratch directory behind.
    pub fn mount(&self) -> Result<PathBuf, MountError> {
        let mut state = self.state.lock();

        if matches!(state.resolution, Resolution::Unresolved) {
            if let Some(mountable) = &self.mountable {
                let (mounts, release) = mountable.mount().map_err(MountError::Resolve)?;
                tracing::debug!(count = mounts.len(), "Resolved snapshot mounts");
                state.resolution = Resolution::Resolved { mounts, release };
            }
        }

        let mount = state.resolution.single()?.clone();

        if let Some(target) = &state.target {
            return Ok(target.clone());
        }

        if let MountKind::Bind {
            read_only: false, ..
        } = mount.kind
        {
            tracing::debug!(
                source = %mount.source.display(),
                "Using writable bind source directly"
            );
            return Ok(mount.source);
        }

        let dir = self.create_temp_dir()?;

        match &mount.kind {
            MountKind::Bind { read_only, .. } => self
                .bind_filter
                .apply_binding(&dir, &mount.source, *read_only)
                .map_err(|source| MountError::Bind {
                    mount: mount.to_string(),
                    target: dir.clone(),
                    source,
                })?,
            MountKind::Native { .. } => mount_with_retries(
                || self.native.mount(&mount, &dir),
                &self.retry,
                self.sleeper.as_ref(),
            )
            .map_err(|source| MountError::Mount {
                mount: mount.to_string(),
                target: dir.clone(),
                source,
            })?,
        }

        tracing::info!(target = %dir.display(), %mount, "Snapshot mounted");
        state.target = Some(dir.clone());
        Ok(dir)
    }

    /// Tear down the mount and release the snapshot.
    ///
    /// The release callback runs whenever one was recorded, even if there was
    /// no mount point to tear down.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::NotImplemented`] unless exactly one mount was
    /// resolved, an unmount error if the mount point could not be detached, or
    /// the release error.
    pub fn unmount(&self) -> Result<(), MountError> {
        let mut state = self.state.lock();
        let mount = state.resolution.single()?;

        if let Some(target) = &state.target {
            match &mount.kind {
                MountKind::Bind { .. } => match self.bind_filter.remove_binding(target) {
                    Ok(()) => {}
                    Err(err) if err.is_not_bound() => {
                        tracing::debug!(target = %target.display(), error = %err, "Bind already removed");
                    }
                    Err(source) => {
                        return Err(MountError::Unbind {
                            target: target.clone(),
                            source,
                        });
                    }
                },
                MountKind::Native { .. } => {
                    self.native
                        .unmount(target)
                        .map_err(|source| MountError::Unmount {
                            target: target.clone(),
                            source,
                        })?;
                }
            }

            remove_temp_dir(target);
            tracing::info!(target = %target.display(), "Snapshot unmounted");
            state.target = None;
        }

        match &state.resolution {
            Resolution::Resolved {
                release: Some(release),
                ..
            } => release().map_err(MountError::Release),
            _ => Ok(()),
        }
    }

    fn create_temp_dir(&self) -> Result<PathBuf, MountError> {
        let temp_dir = |source| MountError::TempDir {
            root: self.temp_root.clone(),
            source,
        };

        std::fs::create_dir_all(&self.temp_root).map_err(temp_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(&self.temp_prefix)
            .tempdir_in(&self.temp_root)
            .map_err(temp_dir)?
            .keep();

        tracing::debug!(dir = %dir.display(), "Created scratch mount point");
        Ok(dir)
    }
}

/// Best effort; the unmount itself already succeeded.
fn remove_temp_dir(dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %err, "Failed to remove scratch mount point");
    }
}

impl std::fmt::Debug for LocalMounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LocalMounter")
            .field("mounts", &state.resolution.mounts())
            .field("target", &state.target)
            .field("retry", &self.retry)
            .field("temp_root", &self.temp_root)
            .finish_non_exhaustive()
    }
}
