//! The cycle loop.

use crate::error::HostError;
use serde_json::{json, Map, Value};
use smctl_core::Controller;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runs cycles until stopped or the cycle limit is reached.
pub struct Runner {
    controller: Controller,
    stop: Arc<AtomicBool>,
    max_cycles: Option<u64>,
}

impl Runner {
    pub fn new(controller: Controller, stop: Arc<AtomicBool>) -> Self {
        Self {
            controller,
            stop,
            max_cycles: None,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Runs the loop and returns the number of cycles completed.
    pub fn run(&mut self) -> u64 {
        tracing::info!(
            device = self.controller.device_id(),
            machines = self.controller.machines().len(),
            max_cycles = ?self.max_cycles,
            "controller running"
        );

        let mut cycles = 0;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                tracing::info!("stop requested");
                break;
            }
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            let report = self.controller.cycle();
            cycles += 1;
            tracing::trace!(
                cycle = report.cycle,
                transitions = report.transitions,
                sleep = report.sleep,
                "cycle"
            );
        }

        tracing::info!(cycles, "controller stopped");
        cycles
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Machine states and variables as JSON.
    pub fn snapshot(&self) -> Result<Value, HostError> {
        let mut variables = Map::new();
        for (name, value) in self.controller.compute().store().iter() {
            variables.insert(name.to_string(), serde_json::to_value(value)?);
        }
        Ok(json!({
            "device": self.controller.device_id(),
            "cycles": self.controller.cycle_count(),
            "machines": serde_json::to_value(self.controller.machines())?,
            "variables": variables,
        }))
    }
}
