//! Mount descriptors and the native mount backend.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// What kind of attachment a [`Mount`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountKind {
    /// Make the target reflect the source directory.
    Bind {
        /// Also bind submounts of the source (`rbind`).
        recursive: bool,
        /// Enforce read-only access through the target.
        read_only: bool,
    },
    /// Mount a filesystem of the given type.
    Native {
        /// Filesystem type passed to `mount(2)`, e.g. `overlay` or `ext4`.
        fstype: String,
    },
}

/// A single filesystem attachment produced by a snapshot provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Mount kind.
    pub kind: MountKind,
    /// Source path or device.
    pub source: PathBuf,
    /// Mount options, `fstab` style.
    pub options: Vec<String>,
}

impl Mount {
    /// Build a descriptor from a type string, a source and options.
    ///
    /// `bind` and `rbind` become [`MountKind::Bind`], reading the read-only
    /// flag from the `ro` option. Any other type is a native filesystem.
    pub fn from_parts(
        mount_type: &str,
        source: impl Into<PathBuf>,
        options: Vec<String>,
    ) -> Self {
        let read_only = has_read_only(&options);
        let kind = match mount_type {
            "bind" => MountKind::Bind {
                recursive: false,
                read_only,
            },
            "rbind" => MountKind::Bind {
                recursive: true,
                read_only,
            },
            other => MountKind::Native {
                fstype: other.to_string(),
            },
        };

        Self {
            kind,
            source: source.into(),
            options,
        }
    }

    /// The type string, as `mount(8)` would spell it.
    #[must_use]
    pub fn mount_type(&self) -> &str {
        match &self.kind {
            MountKind::Bind {
                recursive: false, ..
            } => "bind",
            MountKind::Bind {
                recursive: true, ..
            } => "rbind",
            MountKind::Native { fstype } => fstype,
        }
    }

    /// Whether this is a bind or rbind mount.
    #[must_use]
    pub fn is_bind(&self) -> bool {
        matches!(self.kind, MountKind::Bind { .. })
    }

    /// Whether the mount is read-only.
    #[must_use]
    pub fn read_only(&self) -> bool {
        match &self.kind {
            MountKind::Bind { read_only, .. } => *read_only,
            MountKind::Native { .. } => has_read_only(&self.options),
        }
    }

    /// Attach this mount at `target` with `mount(2)`.
    ///
    /// Known flag options (`ro`, `nosuid`, `noexec`, ...) become mount flags,
    /// everything else is handed to the filesystem as its data string.
    #[cfg(target_os = "linux")]
    pub fn mount(&self, target: &Path) -> io::Result<()> {
        use rustix::mount::{MountFlags, mount, mount_remount};
        use std::ffi::CString;

        let (mut flags, data) = parse_options(&self.options);
        let fstype = match &self.kind {
            MountKind::Bind { recursive, .. } => {
                flags |= MountFlags::BIND;
                if *recursive {
                    flags |= MountFlags::REC;
                }
                ""
            }
            MountKind::Native { fstype } => fstype.as_str(),
        };

        tracing::debug!(
            source = %self.source.display(),
            target = %target.display(),
            fstype,
            data = %data,
            "Mounting filesystem"
        );

        let fstype_c = CString::new(fstype).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "filesystem type contains a null byte",
            )
        })?;
        let data_c = CString::new(data).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "mount options contain a null byte",
            )
        })?;

        mount(
            self.source.as_path(),
            target,
            fstype_c.as_c_str(),
            flags,
            data_c.as_c_str(),
        )?;

        // The kernel ignores RDONLY on the initial bind.
        if self.is_bind() && flags.contains(MountFlags::RDONLY) {
            mount_remount(target, MountFlags::BIND | MountFlags::RDONLY, c"")?;
        }

        Ok(())
    }

    /// Attach this mount at `target`.
    #[cfg(not(target_os = "linux"))]
    pub fn mount(&self, _target: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "native mounts are only supported on Linux",
        ))
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={},source={},options=[{}]",
            self.mount_type(),
            self.source.display(),
            self.options.join(",")
        )
    }
}

/// Any `ro` makes the descriptor read-only, whatever else is listed.
fn has_read_only(options: &[String]) -> bool {
    options.iter().any(|o| o == "ro")
}

/// Split `fstab` style options into mount flags and the filesystem data string.
#[cfg(target_os = "linux")]
fn parse_options(options: &[String]) -> (rustix::mount::MountFlags, String) {
    use rustix::mount::MountFlags;

    // (option, clear, flag)
    const FLAGS: &[(&str, bool, MountFlags)] = &[
        ("async", true, MountFlags::SYNCHRONOUS),
        ("atime", true, MountFlags::NOATIME),
        ("bind", false, MountFlags::BIND),
        ("defaults", false, MountFlags::empty()),
        ("dev", true, MountFlags::NODEV),
        ("diratime", true, MountFlags::NODIRATIME),
        ("dirsync", false, MountFlags::DIRSYNC),
        ("exec", true, MountFlags::NOEXEC),
        ("noatime", false, MountFlags::NOATIME),
        ("nodev", false, MountFlags::NODEV),
        ("nodiratime", false, MountFlags::NODIRATIME),
        ("noexec", false, MountFlags::NOEXEC),
        ("norelatime", true, MountFlags::RELATIME),
        ("nostrictatime", true, MountFlags::STRICTATIME),
        ("nosuid", false, MountFlags::NOSUID),
        ("rbind", false, MountFlags::BIND.union(MountFlags::REC)),
        ("relatime", false, MountFlags::RELATIME),
        ("ro", false, MountFlags::RDONLY),
        ("rw", true, MountFlags::RDONLY),
        ("strictatime", false, MountFlags::STRICTATIME),
        ("suid", true, MountFlags::NOSUID),
        ("sync", false, MountFlags::SYNCHRONOUS),
    ];

    let mut flags = MountFlags::empty();
    let mut data = Vec::new();

    for option in options {
        match FLAGS.iter().find(|(name, _, _)| *name == option.as_str()) {
            Some((_, true, flag)) => flags.remove(*flag),
            Some((_, false, flag)) => flags.insert(*flag),
            None => data.push(option.as_str()),
        }
    }

    (flags, data.join(","))
}

/// The native attach/detach primitives used for non-bind mounts.
pub trait NativeMounter: Send + Sync {
    /// Attach `mount` at `target`.
    fn mount(&self, mount: &Mount, target: &Path) -> io::Result<()>;

    /// Detach whatever is mounted at `target`.
    fn unmount(&self, target: &Path) -> io::Result<()>;
}

/// [`NativeMounter`] backed by the host's `mount(2)` and `umount(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl NativeMounter for SystemMounter {
    fn mount(&self, mount: &Mount, target: &Path) -> io::Result<()> {
        mount.mount(target)
    }

    #[cfg(target_os = "linux")]
    fn unmount(&self, target: &Path) -> io::Result<()> {
        use rustix::mount::{UnmountFlags, unmount};

        tracing::debug!(target = %target.display(), "Unmounting filesystem");
        unmount(target, UnmountFlags::empty())?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn unmount(&self, _target: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "native unmounts are only supported on Linux",
        ))
    }
}
