//! # smctl-core
//!
//! Runtime for JSON-defined state machine controllers.
//!
//! This crate provides:
//! - A numeric value type with NaN-aware comparisons
//! - Named debounce timers over a wrapping tick counter
//! - A scoped variable store
//! - The expression engine for conditions and math
//! - Action dispatch with plugins and the assignment action
//! - The cycle scheduler

pub mod compute;
pub mod context;
pub mod controller;
pub mod definition;
pub mod error;
pub mod hooks;
pub mod key;
pub mod registry;
pub mod store;
pub mod timers;
pub mod value;

pub use compute::{Compute, ConditionFn, MathFn};
pub use context::ActionContext;
pub use controller::{Controller, ControllerConfig, CycleReport, MachineInstance, SleepFn};
pub use definition::Issue;
pub use error::CoreError;
pub use hooks::Hooks;
pub use registry::{ActionFn, Plugin, Registry};
pub use store::Store;
pub use timers::{Ticks, Timers};
pub use value::{Comparison, Numeric};
