use std::future::Future;
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A cloneable, thread-safe "stop requested" flag that can be waited on.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        // A bool cannot be left half-written, so a poisoned lock is still usable
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request a stop and wake every waiter.
    pub fn set(&self) {
        *self.flag() = true;
        self.inner.1.notify_all();
    }

    pub fn clear(&self) {
        *self.flag() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.flag()
    }

    /// Block until the flag is set or `timeout` elapses; returns the flag.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.flag();
        let (guard, _) = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Set `stop` every time `next_interrupt` resolves, for as long as it keeps
/// resolving successfully. Returns the error that ended the listening.
///
/// Listening never stops after the first interrupt, so a signal that
/// arrives before startup clears the flag can simply be repeated.
pub async fn relay_interrupts<F, Fut>(stop: StopSignal, mut next_interrupt: F) -> io::Error
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    loop {
        match next_interrupt().await {
            Ok(()) => {
                log::info!("Interrupt received, shutting down");
                stop.set();
            }
            Err(e) => return e,
        }
    }
}
