//! Observer hooks installed by the host.

use crate::value::Numeric;

/// Callbacks invoked by the controller. Every method has a no-op default.
pub trait Hooks {
    /// Called after every successful variable write with the name as the
    /// writer spelled it (before scoping) and the stored value.
    fn on_var_update(&self, _name: &str, _value: Numeric) {}

    /// Called at the end of every cycle with the cycle number (1-based).
    fn after_cycle(&self, _cycle: u64) {}
}
