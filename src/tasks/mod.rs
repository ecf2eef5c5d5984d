pub mod clock;
pub mod commands;
pub mod format;
pub mod seen;
pub mod sinks;
pub mod sources;
pub mod triggers;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runtime switch for automatic delivery, shared between the poller (reader)
/// and the command handler (writer). Cloning shares the same flag.
#[derive(Debug, Clone)]
pub struct AutoPublish(Arc<AtomicBool>);

impl AutoPublish {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

impl Default for AutoPublish {
    fn default() -> Self {
        Self::new(true)
    }
}
