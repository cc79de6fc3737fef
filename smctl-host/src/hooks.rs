//! Hooks that report controller activity through `tracing`.

use smctl_core::{Hooks, Numeric};

/// Logs every variable update at debug and every cycle at trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl Hooks for LoggingHooks {
    fn on_var_update(&self, name: &str, value: Numeric) {
        tracing::debug!(var = name, %value, "variable updated");
    }

    fn after_cycle(&self, cycle: u64) {
        tracing::trace!(cycle, "cycle complete");
    }
}
