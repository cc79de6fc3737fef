//! Native action registry and dispatch.

use crate::compute::Compute;
use crate::context::ActionContext;
use crate::key::NameMap;
use serde_json::Value;
use std::rc::Rc;

/// A native action callable from a definition.
pub type ActionFn = Rc<dyn Fn(&mut ActionContext<'_>)>;

/// Name of the assignment pseudo-action: `{":=": ["var", expr]}`.
pub const ASSIGN: &str = ":=";

/// A named bundle of actions addressed as `<plugin>.<action>`.
///
/// Variable accessors inside a plugin action are scoped under the plugin id.
pub struct Plugin {
    id: String,
    actions: NameMap<ActionFn>,
}

impl Plugin {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actions: NameMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers an action. The last registration wins.
    pub fn register_action<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) + 'static,
    {
        self.actions.insert(name, Rc::new(f));
    }

    /// Builder form of [`Plugin::register_action`].
    pub fn with_action<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>) + 'static,
    {
        self.register_action(name, f);
        self
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|(name, _)| name)
    }

    fn action(&self, name: &str) -> Option<ActionFn> {
        self.actions.get(name).cloned()
    }
}

/// Controller-level actions and plugins.
#[derive(Default)]
pub struct Registry {
    actions: NameMap<ActionFn>,
    plugins: NameMap<Plugin>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) + 'static,
    {
        self.actions.insert(name, Rc::new(f));
    }

    /// Registers a plugin under its id, replacing any previous one.
    pub fn register_plugin(&mut self, plugin: Plugin) {
        let id = plugin.id.clone();
        self.plugins.insert(&id, plugin);
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    pub fn plugin(&self, id: &str) -> Option<&Plugin> {
        self.plugins.get(id)
    }

    /// Runs one action reference: a bare name, or an object of
    /// `name: [params]` pairs dispatched in order. Pairs whose value is not
    /// an array are skipped. Returns the number of callbacks invoked.
    pub fn run(&self, compute: &mut Compute, action: &Value) -> usize {
        match action {
            Value::String(name) if !name.is_empty() => {
                usize::from(self.dispatch(compute, name, &[]))
            }
            Value::Object(pairs) => pairs
                .iter()
                .filter_map(|(name, params)| params.as_array().map(|p| (name, p)))
                .filter(|(name, params)| self.dispatch(compute, name, params))
                .count(),
            _ => 0,
        }
    }

    /// Dispatches `name` with `params`: registered actions first, then
    /// `<plugin>.<action>`, then the assignment pseudo-action.
    pub fn dispatch(&self, compute: &mut Compute, name: &str, params: &[Value]) -> bool {
        if let Some(action) = self.actions.get(name).cloned() {
            tracing::debug!(action = name, "run action");
            action(&mut ActionContext::new(compute, params));
            return true;
        }

        if let Some((plugin_id, action_id)) = name.split_once('.') {
            return self.dispatch_plugin(compute, plugin_id, action_id, params);
        }

        if name == ASSIGN {
            return assign(compute, params);
        }

        tracing::debug!(action = name, "unknown action");
        false
    }

    fn dispatch_plugin(
        &self,
        compute: &mut Compute,
        plugin_id: &str,
        action_id: &str,
        params: &[Value],
    ) -> bool {
        if plugin_id.is_empty() || action_id.is_empty() {
            return false;
        }
        let Some(plugin) = self.plugins.get(plugin_id) else {
            tracing::debug!(plugin = plugin_id, "unknown plugin");
            return false;
        };
        let Some(action) = plugin.action(action_id) else {
            tracing::debug!(plugin = plugin_id, action = action_id, "unknown plugin action");
            return false;
        };

        tracing::debug!(plugin = plugin_id, action = action_id, "run plugin action");
        action(&mut ActionContext::for_plugin(compute, params, plugin.id()));
        true
    }
}

fn assign(compute: &mut Compute, params: &[Value]) -> bool {
    let [Value::String(name), expr] = params else {
        return false;
    };
    if name.is_empty() {
        return false;
    }
    let value = compute.eval_math(expr);
    compute.store_mut().update_var(name, value, true);
    true
}
