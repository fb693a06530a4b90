//! The provider side of the mount lifecycle.

use std::sync::Arc;

use bock_common::BockResult;

use crate::mount::Mount;

/// Signals the provider that the consumer is done with the mounts it handed out.
///
/// Called from whichever thread runs [`LocalMounter::unmount`](crate::LocalMounter::unmount),
/// once per unmount. Tolerating repeated calls is up to the provider.
pub type Release = Box<dyn Fn() -> BockResult<()> + Send + Sync>;

/// Something that can be resolved into an ordered list of mounts.
///
/// Resolution may be expensive; [`LocalMounter`](crate::LocalMounter) calls
/// [`Mountable::mount`] at most once.
pub trait Mountable: Send + Sync {
    /// Resolve the mounts, with an optional release callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be prepared.
    fn mount(&self) -> BockResult<(Vec<Mount>, Option<Release>)>;
}

impl<F> Mountable for F
where
    F: Fn() -> BockResult<(Vec<Mount>, Option<Release>)> + Send + Sync,
{
    fn mount(&self) -> BockResult<(Vec<Mount>, Option<Release>)> {
        self()
    }
}

/// A provider over a fixed list of mounts.
#[derive(Clone, Default)]
pub struct StaticMountable {
    mounts: Vec<Mount>,
    release: Option<Arc<dyn Fn() -> BockResult<()> + Send + Sync>>,
}

impl StaticMountable {
    /// Create a provider that always resolves to `mounts`.
    #[must_use]
    pub fn new(mounts: Vec<Mount>) -> Self {
        Self {
            mounts,
            release: None,
        }
    }

    /// Run `release` whenever the consumer releases the mounts.
    #[must_use]
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: Fn() -> BockResult<()> + Send + Sync + 'static,
    {
        self.release = Some(Arc::new(release));
        self
    }
}

impl Mountable for StaticMountable {
    fn mount(&self) -> BockResult<(Vec<Mount>, Option<Release>)> {
        let release = self.release.clone().map(|release| {
            let release: Release = Box::new(move || release());
            release
        });
        Ok((self.mounts.clone(), release))
    }
}

impl std::fmt::Debug for StaticMountable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticMountable")
            .field("mounts", &self.mounts)
            .field("release", &self.release.is_some())
            .finish()
    }
}
