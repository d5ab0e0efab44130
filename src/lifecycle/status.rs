use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use super::registry::{lock, panic_message};

type StatusFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Named functions describing the running process, gathered on demand into a
/// plain-text diagnostics dump.
#[derive(Default)]
pub(crate) struct StatusBoard {
    entries: Mutex<Vec<(String, StatusFn)>>,
}

impl StatusBoard {
    pub(crate) fn register(&self, name: String, status: StatusFn) {
        lock(&self.entries).push((name, status));
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// One section per function, in registration order. A panicking status
    /// function shows up as such in its own section.
    pub(crate) fn gather(&self) -> String {
        let entries = lock(&self.entries).clone();

        let mut out = String::new();
        for (name, status) in entries {
            let text = panic::catch_unwind(AssertUnwindSafe(|| status())).unwrap_or_else(|payload| {
                log::warn!("Status function {name} panicked");
                format!("status unavailable: {}", panic_message(&*payload))
            });
            out.push_str(&format!("--------- {} ---------\n{text}\n\n\n", heading(&name)));
        }
        out
    }
}

fn heading(name: &str) -> String {
    name.replace('_', " ").to_uppercase()
}
