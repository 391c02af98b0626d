//! Ownership registry of created runs.

use log;

use crate::run::{RunHandle, RunStore};

/// Tracks every run created during a single sort invocation so that all of them can be
/// deleted at the end, whether the invocation succeeded or failed.
///
/// Runs are registered right after creation, before anything is written to them.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: Vec<RunHandle>,
}

impl RunRegistry {
    pub fn new() -> Self {
        RunRegistry::default()
    }

    /// Takes ownership of a freshly created run.
    pub fn register(&mut self, run: RunHandle) {
        self.runs.push(run);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Discards every registered run and empties the registry.
    /// Discard failures are reported by the store and never interrupt the cleanup.
    pub fn discard_all<S: RunStore>(&mut self, store: &mut S) {
        log::info!("cleaning all temporary runs ({})", self.runs.len());
        for run in self.runs.drain(..) {
            store.discard(&run);
        }
    }
}
