//! Parameter view handed to native callbacks.

use crate::compute::Compute;
use crate::timers::Ticks;
use crate::value::Numeric;
use serde_json::Value;

/// What a native action, math function or condition sees when invoked.
///
/// Parameters are expression nodes from the definition document and are
/// evaluated lazily, only when a callback asks for them. Out-of-range indices
/// return the supplied default.
///
/// Inside a plugin action the variable accessors are scoped under the plugin
/// id, so `set_var("temp", ..)` on plugin `bme` writes `bme.temp`.
pub struct ActionContext<'a> {
    compute: &'a mut Compute,
    params: &'a [Value],
    plugin: Option<&'a str>,
}

impl<'a> ActionContext<'a> {
    pub fn new(compute: &'a mut Compute, params: &'a [Value]) -> Self {
        Self {
            compute,
            params,
            plugin: None,
        }
    }

    /// A context whose variable accessors are scoped under `plugin`.
    pub fn for_plugin(compute: &'a mut Compute, params: &'a [Value], plugin: &'a str) -> Self {
        Self {
            compute,
            params,
            plugin: Some(plugin),
        }
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The unevaluated expression node at `index`.
    pub fn param_raw(&self, index: usize) -> Option<&'a Value> {
        self.params.get(index)
    }

    pub fn param_as_numeric(&mut self, index: usize, default: Numeric) -> Numeric {
        let params = self.params;
        match params.get(index) {
            Some(node) => self.compute.eval_math(node),
            None => default,
        }
    }

    pub fn param_as_int(&mut self, index: usize, default: i64) -> i64 {
        let params = self.params;
        match params.get(index) {
            Some(node) => self.compute.eval_math(node).as_i64(),
            None => default,
        }
    }

    pub fn param_as_float(&mut self, index: usize, default: f64) -> f64 {
        let params = self.params;
        match params.get(index) {
            Some(node) => self.compute.eval_math(node).as_f64(),
            None => default,
        }
    }

    /// Evaluates the parameter with condition semantics.
    pub fn param_as_bool(&mut self, index: usize, default: bool) -> bool {
        let params = self.params;
        match params.get(index) {
            Some(node) => self.compute.eval_condition(node),
            None => default,
        }
    }

    /// Writes a local variable (plugin-scoped inside a plugin action).
    pub fn set_var(&mut self, name: &str, value: impl Into<Numeric>) {
        let name = self.qualify(name);
        self.compute.store_mut().set_var(&name, value.into(), true);
    }

    pub fn get_var(&self, name: &str) -> Option<Numeric> {
        self.compute.store().get_var(&self.qualify(name))
    }

    pub fn get_var_int(&self, name: &str, default: i64) -> i64 {
        self.compute.store().get_var_int(&self.qualify(name), default)
    }

    pub fn get_var_float(&self, name: &str, default: f64) -> f64 {
        self.compute
            .store()
            .get_var_float(&self.qualify(name), default)
    }

    /// Current tick of the controller's clock.
    pub fn now(&self) -> Ticks {
        self.compute.timers().now()
    }

    /// Full access to the engine, its store and timers.
    pub fn compute(&mut self) -> &mut Compute {
        self.compute
    }

    fn qualify(&self, name: &str) -> String {
        match self.plugin {
            Some(plugin) => format!("{}.{}", plugin, name),
            None => name.to_string(),
        }
    }
}
