//! Scoped variable storage.
//!
//! Variables are created on first write and live for the lifetime of the
//! store. Local writes are stored under `<scope>.<name>`; reads try the name
//! as given first and then the scoped form, so `"var1"` and `"sm.var1"`
//! resolve to the same local variable on a controller scoped `sm`.

use crate::hooks::Hooks;
use crate::key::NameMap;
use crate::value::Numeric;
use std::rc::Rc;

/// Variable store owned by one controller.
pub struct Store {
    scope: String,
    vars: NameMap<Numeric>,
    hooks: Option<Rc<dyn Hooks>>,
}

impl Store {
    /// Creates an empty store whose local variables are scoped by `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            vars: NameMap::new(),
            hooks: None,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Installs the update-notify hook.
    pub fn set_hooks(&mut self, hooks: Rc<dyn Hooks>) {
        self.hooks = Some(hooks);
    }

    /// Returns `<scope>.<name>`.
    pub fn scoped_name(&self, name: &str) -> String {
        format!("{}.{}", self.scope, name)
    }

    /// Writes a variable, creating it if absent, and notifies the hook.
    ///
    /// With `is_local` the value is stored under the scoped name. The hook
    /// always receives `name` as passed in.
    pub fn set_var(&mut self, name: &str, value: Numeric, is_local: bool) {
        if is_local {
            let scoped = self.scoped_name(name);
            self.write(&scoped, value);
        } else {
            self.write(name, value);
        }
        tracing::trace!(var = name, %value, "set var");
        self.notify(name, value);
    }

    /// Looks up a variable by bare name, then by scoped name.
    pub fn get_var(&self, name: &str) -> Option<Numeric> {
        self.resolve(name).and_then(|key| self.vars.get(&key)).copied()
    }

    /// Integer read with an explicit default for absent variables.
    pub fn get_var_int(&self, name: &str, default: i64) -> i64 {
        self.get_var(name).map(|v| v.as_i64()).unwrap_or(default)
    }

    /// Float read with an explicit default for absent variables.
    pub fn get_var_float(&self, name: &str, default: f64) -> f64 {
        self.get_var(name).map(|v| v.as_f64()).unwrap_or(default)
    }

    /// Re-resolves `name` and writes through the existing slot.
    ///
    /// When the variable already exists and `only_on_change` is set, an
    /// identical value is neither written nor notified. A missing variable
    /// is created as a local one, exactly like [`Store::set_var`].
    pub fn update_var(&mut self, name: &str, value: Numeric, only_on_change: bool) {
        let Some(key) = self.resolve(name) else {
            self.set_var(name, value, true);
            return;
        };

        if let Some(slot) = self.vars.get_mut(&key) {
            if only_on_change && *slot == value {
                return;
            }
            *slot = value;
        }
        tracing::trace!(var = name, %value, "update var");
        self.notify(name, value);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates stored `(full name, value)` pairs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Numeric)> {
        self.vars.iter().map(|(k, v)| (k, *v))
    }

    fn resolve(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        if self.vars.contains(name) {
            return Some(name.to_string());
        }
        let scoped = self.scoped_name(name);
        self.vars.contains(&scoped).then_some(scoped)
    }

    fn write(&mut self, key: &str, value: Numeric) {
        *self.vars.get_or_insert_with(key, Numeric::default) = value;
    }

    fn notify(&self, name: &str, value: Numeric) {
        if let Some(hooks) = &self.hooks {
            hooks.on_var_update(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        updates: RefCell<Vec<(String, Numeric)>>,
    }

    impl Hooks for Recorder {
        fn on_var_update(&self, name: &str, value: Numeric) {
            self.updates.borrow_mut().push((name.to_string(), value));
        }
    }

    #[test]
    fn test_scoped_name() {
        let store = Store::new("sm");
        assert_eq!(store.scoped_name("test"), "sm.test");
    }

    #[test]
    fn test_set_and_get_int() {
        let mut store = Store::new("sm");
        store.set_var("test", Numeric::Long(42), true);
        assert_eq!(store.get_var_int("test", 0), 42);
        store.set_var("test1", Numeric::Float(42.1), true);
        assert_eq!(store.get_var_int("test1", 0), 42);
        assert_eq!(store.get_var_int("test2", 0), 0);
        assert_eq!(store.get_var_int("test2", 7), 7);
    }

    #[test]
    fn test_set_and_get_float() {
        let mut store = Store::new("sm");
        store.set_var("test", Numeric::Float(42.0), true);
        assert_eq!(store.get_var_float("test", 0.0), 42.0);
        store.set_var("test2", Numeric::Long(42), true);
        assert_eq!(store.get_var_float("test2", 0.0), 42.0);
        assert_eq!(store.get_var_float("missing", 1.5), 1.5);
    }

    #[test]
    fn test_lookup_order() {
        let mut store = Store::new("sm");
        store.set_var("x", Numeric::Long(1), true);
        store.set_var("x", Numeric::Long(2), false);

        // The bare name wins over the scoped one.
        assert_eq!(store.get_var("x"), Some(Numeric::Long(2)));
        assert_eq!(store.get_var("sm.x"), Some(Numeric::Long(1)));
        assert_eq!(store.get_var("SM.X"), Some(Numeric::Long(1)));
        assert_eq!(store.get_var("y"), None);
        assert_eq!(store.get_var(""), None);
    }

    #[test]
    fn test_non_local_write() {
        let mut store = Store::new("sm");
        store.set_var("weather.temp", Numeric::Float(25.5), false);
        assert_eq!(store.get_var("weather.temp"), Some(Numeric::Float(25.5)));
        assert_eq!(store.iter().next(), Some(("weather.temp", Numeric::Float(25.5))));
    }

    #[test]
    fn test_set_var_notifies_unscoped_name() {
        let recorder = Rc::new(Recorder::default());
        let mut store = Store::new("sm");
        store.set_hooks(recorder.clone());

        store.set_var("a", Numeric::Long(1), true);
        store.set_var("a", Numeric::Long(1), true);

        let updates = recorder.updates.borrow();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], ("a".to_string(), Numeric::Long(1)));
    }

    #[test]
    fn test_update_var_skips_unchanged() {
        let recorder = Rc::new(Recorder::default());
        let mut store = Store::new("sm");
        store.set_hooks(recorder.clone());

        store.update_var("a", Numeric::Long(1), true);
        store.update_var("a", Numeric::Long(1), true);
        store.update_var("a", Numeric::Long(1), false);
        store.update_var("a", Numeric::Long(2), true);

        assert_eq!(recorder.updates.borrow().len(), 3);
        assert_eq!(store.get_var_int("a", 0), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_var_writes_through_resolved_slot() {
        let mut store = Store::new("sm");
        store.set_var("ext", Numeric::Long(1), false);
        store.update_var("ext", Numeric::Long(5), true);

        assert_eq!(store.get_var("ext"), Some(Numeric::Long(5)));
        assert_eq!(store.get_var("sm.ext"), None);
        assert_eq!(store.len(), 1);
    }
}
