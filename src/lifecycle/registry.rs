use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::error::{HookResult, LifecycleError};
use super::status::StatusBoard;
use super::stop::StopSignal;

/// Priority for hooks that do not care where they run.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Priority of the built-in hooks that drive the stop signal.
const STOP_SIGNAL_PRIORITY: i32 = 0;

type Hook = Arc<dyn Fn() -> HookResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Running,
    Stopped,
}

#[derive(Default)]
struct Registry {
    hooks: BTreeMap<i32, Vec<Hook>>,
}

impl Registry {
    fn push(&mut self, priority: i32, hook: Hook) {
        self.hooks.entry(priority).or_default().push(hook);
    }

    /// Hooks in execution order, so they can run without the lock held.
    fn snapshot(&self) -> Vec<(i32, Hook)> {
        self.hooks
            .iter()
            .flat_map(|(priority, hooks)| hooks.iter().map(|hook| (*priority, Arc::clone(hook))))
            .collect()
    }

    fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }
}

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owns the startup and shutdown hooks of a host process and the stop signal
/// its main loop waits on.
///
/// A fresh manager already holds two hooks at priority 0: startup clears the
/// stop signal and shutdown sets it.
pub struct LifecycleManager {
    startup: Mutex<Registry>,
    shutdown: Mutex<Registry>,
    state: Mutex<LifecycleState>,
    stopped: StopSignal,
    status: StatusBoard,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("startup_hooks", &lock(&self.startup).len())
            .field("shutdown_hooks", &lock(&self.shutdown).len())
            .field("status_functions", &self.status.len())
            .field("state", &self.state())
            .field("stopped", &self.stopped.is_set())
            .finish()
    }
}

impl LifecycleManager {
    pub fn new() -> Self {
        let manager = Self {
            startup: Mutex::new(Registry::default()),
            shutdown: Mutex::new(Registry::default()),
            state: Mutex::new(LifecycleState::NotStarted),
            stopped: StopSignal::new(),
            status: StatusBoard::default(),
        };

        let stopped = manager.stopped.clone();
        manager.register_startup(STOP_SIGNAL_PRIORITY, move || {
            stopped.clear();
            Ok(())
        });
        let stopped = manager.stopped.clone();
        manager.register_shutdown(STOP_SIGNAL_PRIORITY, move || {
            stopped.set();
            Ok(())
        });

        manager
    }

    /// Register a hook to run at startup. Lower priorities run first.
    pub fn register_startup<F>(&self, priority: i32, hook: F)
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        lock(&self.startup).push(priority, Arc::new(hook));
    }

    /// Register a hook to run at shutdown. Lower priorities run first.
    pub fn register_shutdown<F>(&self, priority: i32, hook: F)
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        lock(&self.shutdown).push(priority, Arc::new(hook));
    }

    /// Register a named function describing some part of the running
    /// process. `gather_status` shows it under the name upper-cased, with
    /// underscores turned into spaces.
    pub fn register_status<F>(&self, name: impl Into<String>, status: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.status.register(name.into(), Arc::new(status));
    }

    /// Text dump of every registered status function, in registration order,
    /// each under a `--------- NAME ---------` heading.
    pub fn gather_status(&self) -> String {
        self.status.gather()
    }

    pub fn state(&self) -> LifecycleState {
        *lock(&self.state)
    }

    /// Handle on the signal the main loop waits for; setting it from any
    /// thread makes the loop proceed to shutdown.
    pub fn stop_signal(&self) -> StopSignal {
        self.stopped.clone()
    }

    /// Run every startup hook. The first failure aborts the remaining hooks
    /// and is returned.
    pub fn run_startup(&self) -> Result<(), LifecycleError> {
        if self.state() == LifecycleState::Stopped {
            log::warn!("Running startup hooks again after shutdown");
        }

        let hooks = lock(&self.startup).snapshot();
        log::debug!("Running {} startup hook(s)", hooks.len());

        for (priority, hook) in hooks {
            if let Err(source) = hook() {
                log::error!("Startup hook with priority {priority} failed: {source}");
                return Err(LifecycleError::Startup { priority, source });
            }
        }

        *lock(&self.state) = LifecycleState::Running;
        Ok(())
    }

    /// Run every shutdown hook. A hook that fails or panics is logged and
    /// skipped; the collected failures are returned.
    pub fn run_shutdown(&self) -> Vec<LifecycleError> {
        let hooks = lock(&self.shutdown).snapshot();
        log::debug!("Running {} shutdown hook(s)", hooks.len());

        let mut failures = Vec::new();
        for (priority, hook) in hooks {
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| hook())) {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => LifecycleError::Shutdown { priority, source },
                Err(payload) => LifecycleError::ShutdownPanic {
                    priority,
                    message: panic_message(&*payload),
                },
            };

            match failure.source() {
                Some(source) => log::warn!("Ignored error during shutdown: {failure}: {source}"),
                None => log::warn!("Ignored error during shutdown: {failure}"),
            }
            failures.push(failure);
        }

        *lock(&self.state) = LifecycleState::Stopped;
        failures
    }

    /// Run startup, block until the stop signal is set (waking at least every
    /// `poll_interval`), then run shutdown. Shutdown also runs when the wait
    /// unwinds. A startup failure is returned before anything else happens.
    pub fn run_main_loop(&self, poll_interval: Duration) -> Result<(), LifecycleError> {
        self.run_startup()?;
        let _shutdown = ShutdownOnDrop(self);

        log::info!("Main loop running, waiting for stop signal");
        while !self.stopped.is_set() {
            self.stopped.wait_timeout(poll_interval);
        }
        log::info!("Stop signal received");

        Ok(())
    }
}

struct ShutdownOnDrop<'a>(&'a LifecycleManager);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        let failures = self.0.run_shutdown();
        if !failures.is_empty() {
            log::warn!("{} shutdown hook(s) failed", failures.len());
        }
    }
}
