//! The state machine scheduler.
//!
//! A [`Controller`] owns the expression engine, the action registry and the
//! machine instances built from one definition document. Each call to
//! [`Controller::cycle`] runs the before actions, steps every enabled
//! machine at most once, runs the after actions and sleeps.

use crate::compute::Compute;
use crate::context::ActionContext;
use crate::definition::{
    checksum, initial_state, machine_states, rule_parts, AFTER_ACTIONS, BEFORE_ACTIONS, INIT_ACTIONS,
    MACHINES, MACHINE_BEFORE_ACTIONS, MACHINE_INITIAL_ACTIONS, RULE_EXIT_ACTIONS, SLEEP_TIMEOUT,
    STATE_ENTRY_ACTIONS, STATE_RULES,
};
use crate::hooks::Hooks;
use crate::registry::{Plugin, Registry};
use crate::timers::Ticks;
use crate::value::Numeric;
use serde::Serialize;
use serde_json::{Map, Value};
use std::rc::Rc;

/// Injected blocking sleep. Called with 0 as a cooperative yield.
pub type SleepFn = Box<dyn Fn(Ticks)>;

/// Controller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Scope of local variables.
    pub device_id: String,
    /// Machines loaded from a definition; the rest are ignored.
    pub max_machines: usize,
    /// Sleep between cycles when the definition has no sleep expression.
    pub default_sleep: Ticks,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_id: "sm".to_string(),
            max_machines: 16,
            default_sleep: 0,
        }
    }
}

/// A loaded machine and its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineInstance {
    pub name: String,
    /// `None` for a machine without an initial state, which never runs.
    pub state: Option<String>,
}

impl MachineInstance {
    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number since the last `initialize`.
    pub cycle: u64,
    pub transitions: usize,
    /// Requested sleep; 0 when no sleep was made.
    pub sleep: Ticks,
}

pub struct Controller {
    config: ControllerConfig,
    compute: Compute,
    registry: Registry,
    sleep: Option<SleepFn>,
    hooks: Option<Rc<dyn Hooks>>,
    definition: Rc<Value>,
    machines: Vec<MachineInstance>,
    cycles: u64,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            compute: Compute::new(config.device_id.clone()),
            config,
            registry: Registry::new(),
            sleep: None,
            hooks: None,
            definition: Rc::new(Value::Object(Map::new())),
            machines: Vec::new(),
            cycles: 0,
        }
    }

    /// Sets the tick source used by `elapsed` and `ticks`.
    pub fn with_clock(mut self, clock: impl Fn() -> Ticks + 'static) -> Self {
        self.compute.timers_mut().set_clock(clock);
        self
    }

    /// Sets the blocking sleep used between cycles and as the yield.
    pub fn with_sleep(mut self, sleep: impl Fn(Ticks) + 'static) -> Self {
        self.sleep = Some(Box::new(sleep));
        self
    }

    /// Installs the variable-update and cycle hooks.
    pub fn set_hooks(&mut self, hooks: Rc<dyn Hooks>) {
        self.compute.store_mut().set_hooks(hooks.clone());
        self.hooks = Some(hooks);
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    pub fn register_action<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) + 'static,
    {
        self.registry.register_action(name, f);
    }

    pub fn register_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) -> Numeric + 'static,
    {
        self.compute.register_function(name, f);
    }

    pub fn register_condition<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) -> bool + 'static,
    {
        self.compute.register_condition(name, f);
    }

    pub fn register_plugin(&mut self, plugin: Plugin) {
        tracing::debug!(plugin = plugin.id(), "plugin registered");
        self.registry.register_plugin(plugin);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Loads a definition: runs its init actions, then builds the machines
    /// in document order up to the configured capacity. Any previous
    /// machines and timer arming are discarded; variables are kept.
    pub fn initialize(&mut self, definition: Value) {
        self.definition = Rc::new(definition);
        self.machines.clear();
        self.compute.timers_mut().clear();
        self.cycles = 0;

        let definition = Rc::clone(&self.definition);
        tracing::info!(
            device = %self.config.device_id,
            checksum = %checksum(&definition),
            "loading definition"
        );

        self.run_actions(definition.get(INIT_ACTIONS));

        let Some(machines) = definition.get(MACHINES).and_then(Value::as_object) else {
            tracing::debug!("definition has no machines");
            return;
        };

        for (name, machine) in machines {
            let Some(states) = machine_states(machine) else {
                tracing::debug!(machine = %name, "skipping malformed machine");
                continue;
            };

            if self.machines.len() >= self.config.max_machines {
                tracing::warn!(
                    machine = %name,
                    capacity = self.config.max_machines,
                    "machine capacity reached; remaining machines ignored"
                );
                break;
            }

            self.machines.push(MachineInstance {
                name: name.clone(),
                state: None,
            });
            let index = self.machines.len() - 1;

            self.run_actions(machine.get(MACHINE_INITIAL_ACTIONS));

            match initial_state(machine) {
                Some(initial) => self.switch_state(index, initial, states),
                None => tracing::warn!(machine = %name, "no initial state; machine disabled"),
            }
        }

        tracing::info!(machines = self.machines.len(), "definition loaded");
    }

    /// Runs one scheduling pass and sleeps for the configured timeout.
    pub fn cycle(&mut self) -> CycleReport {
        let definition = Rc::clone(&self.definition);

        self.run_actions(definition.get(BEFORE_ACTIONS));

        let machines = definition.get(MACHINES).and_then(Value::as_object);
        let mut transitions = 0;
        for index in 0..self.machines.len() {
            let machine = machines.and_then(|m| m.get(&self.machines[index].name));
            if let Some(machine) = machine {
                if self.step(index, machine) {
                    transitions += 1;
                }
            }
        }

        self.run_actions(definition.get(AFTER_ACTIONS));

        self.cycles += 1;
        if let Some(hooks) = &self.hooks {
            hooks.after_cycle(self.cycles);
        }

        let sleep = self.sleep_timeout(&definition);
        if sleep > 0 {
            tracing::trace!(ticks = sleep, "sleeping");
            self.sleep_for(sleep);
        }

        CycleReport {
            cycle: self.cycles,
            transitions,
            sleep,
        }
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    pub fn machines(&self) -> &[MachineInstance] {
        &self.machines
    }

    /// Current state of a machine; `None` if unknown or disabled.
    pub fn machine_state(&self, name: &str) -> Option<&str> {
        self.machines
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.state.as_deref())
    }

    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub fn compute(&self) -> &Compute {
        &self.compute
    }

    pub fn compute_mut(&mut self) -> &mut Compute {
        &mut self.compute
    }

    /// Writes a local variable.
    pub fn set_var(&mut self, name: &str, value: impl Into<Numeric>) {
        self.compute.set_var(name, value);
    }

    pub fn get_var(&self, name: &str) -> Option<Numeric> {
        self.compute.store().get_var(name)
    }

    pub fn get_var_int(&self, name: &str, default: i64) -> i64 {
        self.compute.get_var_int(name, default)
    }

    pub fn get_var_float(&self, name: &str, default: f64) -> f64 {
        self.compute.get_var_float(name, default)
    }

    pub fn eval_math(&mut self, node: &Value) -> Numeric {
        self.compute.eval_math(node)
    }

    pub fn eval_condition(&mut self, node: &Value) -> bool {
        self.compute.eval_condition(node)
    }

    /// Dispatches a single action reference. Returns the callbacks invoked.
    pub fn run_action(&mut self, action: &Value) -> usize {
        self.registry.run(&mut self.compute, action)
    }

    /// Evaluates the current state's rules and takes the first that holds.
    fn step(&mut self, index: usize, machine: &Value) -> bool {
        let Some(state) = self.machines[index].state.clone() else {
            return false;
        };

        self.run_actions(machine.get(MACHINE_BEFORE_ACTIONS));

        let Some(Some(states)) = machine_states(machine) else {
            return false;
        };
        let Some(rules) = states
            .get(&state)
            .and_then(Value::as_object)
            .and_then(|s| s.get(STATE_RULES))
            .and_then(Value::as_array)
        else {
            return false;
        };

        let compute = &mut self.compute;
        let fired = rules.iter().find_map(|rule| {
            let (condition, target) = rule_parts(rule)?;
            compute.eval_condition(condition).then_some((rule, target))
        });
        self.yield_now();

        let Some((rule, target)) = fired else {
            return false;
        };

        tracing::debug!(
            machine = %self.machines[index].name,
            from = %state,
            to = target,
            "rule fired"
        );
        self.run_actions(rule.get(RULE_EXIT_ACTIONS));
        self.switch_state(index, target, Some(states));
        true
    }

    fn switch_state(&mut self, index: usize, target: &str, states: Option<&Map<String, Value>>) {
        if target.is_empty() {
            return;
        }
        tracing::debug!(machine = %self.machines[index].name, state = target, "switch state");
        self.machines[index].state = Some(target.to_string());

        let entry = states
            .and_then(|s| s.get(target))
            .and_then(Value::as_object)
            .and_then(|s| s.get(STATE_ENTRY_ACTIONS));
        self.run_actions(entry);
    }

    fn run_actions(&mut self, actions: Option<&Value>) {
        let Some(Value::Array(actions)) = actions else {
            return;
        };
        for action in actions {
            self.registry.run(&mut self.compute, action);
            self.yield_now();
        }
    }

    fn sleep_timeout(&mut self, definition: &Value) -> Ticks {
        match definition.get(SLEEP_TIMEOUT) {
            Some(expr) => {
                let ticks = self.compute.eval_math(expr).as_i64();
                ticks.clamp(0, i64::from(Ticks::MAX)) as Ticks
            }
            None => self.config.default_sleep,
        }
    }

    fn yield_now(&self) {
        self.sleep_for(0);
    }

    fn sleep_for(&self, ticks: Ticks) {
        if let Some(sleep) = &self.sleep {
            sleep(ticks);
        }
    }
}
