//! Standard filesystem paths for Bock.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Default root directory for Bock data.
pub static BOCK_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("BOCK_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/var/lib/bock"))
});

/// Default runtime directory for Bock.
pub static BOCK_RUNTIME_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("BOCK_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/bock"))
});

/// Standard paths used by the Bock build engine.
#[derive(Debug, Clone)]
pub struct BockPaths {
    /// Root data directory (default: /var/lib/bock).
    pub root: PathBuf,
    /// Runtime directory (default: /run/bock).
    pub runtime: PathBuf,
}

impl BockPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let runtime = root.join("run");
        Self { root, runtime }
    }

    /// Directory holding snapshot data.
    #[must_use]
    pub fn snapshots(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    /// Scratch directory for transient mount points.
    ///
    /// Lives under the runtime dir so stale mount points disappear on reboot.
    #[must_use]
    pub fn mounts(&self) -> PathBuf {
        self.runtime.join("mounts")
    }

    /// Mounter configuration file.
    #[must_use]
    pub fn mounter_config(&self) -> PathBuf {
        self.root.join("mounter.toml")
    }

    /// Create all necessary directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.runtime)?;
        std::fs::create_dir_all(self.snapshots())?;
        std::fs::create_dir_all(self.mounts())?;
        Ok(())
    }
}

impl Default for BockPaths {
    fn default() -> Self {
        Self {
            root: BOCK_ROOT.clone(),
            runtime: BOCK_RUNTIME_DIR.clone(),
        }
    }
}
