//! Ordered startup and shutdown hooks for a long-running host process.
//!
//! Subsystems register hooks with a priority; lower numbers run first and
//! hooks sharing a priority run in registration order. Startup fails loud:
//! the first failing hook aborts the sequence. Shutdown degrades gracefully:
//! every hook runs and failures are only logged and collected.
//!
//! The manager also keeps named status functions that can be gathered into a
//! text dump when diagnosing a running host.
//!
//! ```rust,ignore
//! let lifecycle = LifecycleManager::new();
//! lifecycle.register_startup(10, || { open_pool(); Ok(()) });
//! lifecycle.register_shutdown(DEFAULT_PRIORITY, || { flush(); Ok(()) });
//! lifecycle.run_main_loop(Duration::from_secs(1))?;
//! ```

pub mod error;
pub mod pidfile;
pub mod registry;
mod status;
pub mod stop;

use std::sync::OnceLock;

pub use error::{HookError, HookResult, LifecycleError};
pub use registry::{DEFAULT_PRIORITY, LifecycleManager, LifecycleState};
pub use pidfile::PidFile;
pub use stop::{StopSignal, relay_interrupts};

static GLOBAL: OnceLock<LifecycleManager> = OnceLock::new();

/// The process-wide manager, for subsystems that must register hooks before
/// the host has a chance to hand them one.
pub fn global() -> &'static LifecycleManager {
    GLOBAL.get_or_init(LifecycleManager::new)
}
