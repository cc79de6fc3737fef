//! # smctl-host
//!
//! Host environment for running a controller on a general-purpose OS.
//!
//! This crate provides:
//! - Layered configuration (defaults, YAML file, environment)
//! - A millisecond tick source and an interruptible sleep
//! - Built-in actions, math functions, conditions and the `sys` plugin
//! - Logging hooks
//! - The cycle loop

pub mod builtins;
pub mod clock;
pub mod config;
pub mod error;
pub mod hooks;
pub mod runner;

pub use clock::{MonotonicClock, Sleeper};
pub use config::{Config, ConfigError, ControllerSection, DefinitionConfig, RuntimeConfig};
pub use error::HostError;
pub use hooks::LoggingHooks;
pub use runner::Runner;

use serde_json::Value;
use smctl_core::{definition, Controller};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Reads and parses a definition file.
pub fn load_definition(path: &Path) -> Result<Value, HostError> {
    let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(definition::parse(&text)?)
}

/// Builds a controller wired to the wall clock, an interruptible sleep and
/// logging hooks, with built-ins when enabled. The definition is not loaded.
pub fn build_controller(config: &Config, stop: Arc<AtomicBool>) -> Controller {
    let clock = MonotonicClock::new();
    let sleeper = Sleeper::new(stop);

    let mut controller = Controller::new(config.controller.to_controller_config())
        .with_clock(move || clock.now())
        .with_sleep(move |ticks| sleeper.sleep(ticks));
    controller.set_hooks(Rc::new(LoggingHooks));

    if config.runtime.builtins {
        builtins::install(&mut controller);
    }
    controller
}
