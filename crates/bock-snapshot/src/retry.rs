//! Bounded retries for mount calls that race with other handles on the target.

use std::io;
use std::time::Duration;

/// Error text the host uses when the target is held by someone else.
const BUSY_SIGNATURES: &[&str] = &[
    "being used by another process",
    "resource busy",
];

/// How often and how patiently a busy mount is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Backoff unit; retry `n` (1-based) waits `n * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.saturating_add(1))
    }

    /// Worst-case time spent sleeping.
    #[must_use]
    pub fn max_total_backoff(&self) -> Duration {
        (0..self.retries)
            .map(|attempt| self.backoff_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Blocks the calling thread between retries.
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Whether `err` means the target is momentarily held by another process.
#[must_use]
pub fn is_transient(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }
    let message = err.to_string().to_lowercase();
    BUSY_SIGNATURES.iter().any(|sig| message.contains(sig))
}

/// Run `attempt` until it succeeds, fails for a non-transient reason, or the
/// policy runs out of retries.
///
/// Only busy-target errors are retried. The last error is returned as is.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub fn mount_with_retries<F>(
    mut attempt: F,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> io::Result<()>
where
    F: FnMut() -> io::Result<()>,
{
    let mut retry = 0;
    loop {
        match attempt() {
            Ok(()) => return Ok(()),
            Err(err) if retry < policy.retries && is_transient(&err) => {
                let delay = policy.backoff_for(retry);
                tracing::debug!(
                    retry = retry + 1,
                    max_retries = policy.retries,
                    ?delay,
                    error = %err,
                    "Mount target busy, retrying"
                );
                sleeper.sleep(delay);
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Duration>>);

    impl Sleeper for Recorder {
        fn sleep(&self, duration: Duration) {
            self.0.lock().push(duration);
        }
    }

    fn busy() -> io::Error {
        io::Error::other("The process cannot access the file because it is being used by another process.")
    }

    #[test]
    fn busy_kind_is_transient() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ResourceBusy)));
        assert!(is_transient(&busy()));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test_log::test]
    fn retries_until_success() {
        let sleeper = Recorder::default();
        let mut calls = 0;
        let result = mount_with_retries(
            || {
                calls += 1;
                if calls < 3 { Err(busy()) } else { Ok(()) }
            },
            &RetryPolicy::default(),
            &sleeper,
        );

        assert!(result.is_ok());
        assert_eq!(calls, 3);
        assert_eq!(
            *sleeper.0.lock(),
            vec![Duration::from_millis(30), Duration::from_millis(60)]
        );
    }

    #[test]
    fn gives_up_after_retries() {
        let sleeper = Recorder::default();
        let mut calls = 0;
        let err = mount_with_retries(
            || {
                calls += 1;
                Err(busy())
            },
            &RetryPolicy::default(),
            &sleeper,
        )
        .unwrap_err();

        assert!(is_transient(&err));
        assert_eq!(calls, 3);
        assert_eq!(sleeper.0.lock().len(), 2);
    }

    #[test]
    fn fatal_error_is_not_retried() {
        let sleeper = Recorder::default();
        let mut calls = 0;
        let err = mount_with_retries(
            || {
                calls += 1;
                Err(io::Error::from(io::ErrorKind::NotFound))
            },
            &RetryPolicy::default(),
            &sleeper,
        )
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(calls, 1);
        assert!(sleeper.0.lock().is_empty());
    }

    #[test]
    fn zero_retries() {
        let policy = RetryPolicy {
            retries: 0,
            ..RetryPolicy::default()
        };
        let sleeper = Recorder::default();
        assert!(mount_with_retries(|| Err(busy()), &policy, &sleeper).is_err());
        assert!(sleeper.0.lock().is_empty());
        assert_eq!(policy.max_total_backoff(), Duration::ZERO);
    }

    proptest! {
        #[test]
        fn sleeps_grow_and_stay_bounded(retries in 0u32..8, unit in 1u64..100) {
            let policy = RetryPolicy { retries, backoff: Duration::from_millis(unit) };
            let sleeper = Recorder::default();
            let _ = mount_with_retries(|| Err(busy()), &policy, &sleeper);

            let sleeps = sleeper.0.lock();
            prop_assert_eq!(sleeps.len() as u32, retries);
            prop_assert!(sleeps.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(sleeps.iter().sum::<Duration>(), policy.max_total_backoff());
        }
    }
}
