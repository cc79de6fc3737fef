//! Definition documents.
//!
//! A controller is configured by one JSON document with single-letter keys:
//!
//! ```json
//! {
//!   "i": ["setup"],
//!   "b": [], "a": [],
//!   "t": "ctrl.sleep",
//!   "s": {
//!     "fan": {
//!       "i": "off",
//!       "s": {
//!         "off": {"a": [{":=": ["fan", 0]}], "r": [{"i": {"gt": ["temp", 30]}, "t": "on"}]},
//!         "on":  {"a": [{":=": ["fan", 1]}], "r": [{"i": {"lt": ["temp", 25]}, "t": "off"}]}
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! The runtime never rejects a document; fragments of the wrong shape are
//! skipped. [`inspect`] lists what would be skipped.

use crate::error::CoreError;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Controller: init actions.
pub const INIT_ACTIONS: &str = "i";
/// Controller: before-cycle actions.
pub const BEFORE_ACTIONS: &str = "b";
/// Controller: after-cycle actions.
pub const AFTER_ACTIONS: &str = "a";
/// Controller: machines map.
pub const MACHINES: &str = "s";
/// Controller: sleep-timeout expression.
pub const SLEEP_TIMEOUT: &str = "t";

/// Machine: initial state name.
pub const MACHINE_INITIAL_STATE: &str = "i";
/// Machine: one-shot initial actions.
pub const MACHINE_INITIAL_ACTIONS: &str = "a";
/// Machine: per-cycle before actions.
pub const MACHINE_BEFORE_ACTIONS: &str = "b";
/// Machine: states map.
pub const MACHINE_STATES: &str = "s";

/// State: entry actions.
pub const STATE_ENTRY_ACTIONS: &str = "a";
/// State: ordered rule list.
pub const STATE_RULES: &str = "r";

/// Rule: condition.
pub const RULE_CONDITION: &str = "i";
/// Rule: target state.
pub const RULE_TARGET: &str = "t";
/// Rule: exit actions.
pub const RULE_EXIT_ACTIONS: &str = "a";

/// Parses definition text. The document must be a JSON object.
pub fn parse(text: &str) -> Result<Value, CoreError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(CoreError::InvalidDefinition {
            reason: "top-level value is not an object".to_string(),
        });
    }
    Ok(value)
}

/// CRC32C of the compact serialization, as 8 hex digits.
pub fn checksum(definition: &Value) -> String {
    format!("{:08x}", crc32c::crc32c(definition.to_string().as_bytes()))
}

/// Returns the states map of a machine if the machine would be loaded.
///
/// A machine is skipped when it is not an object or when its states entry
/// is present but not an object. `Some(None)` means a loadable machine
/// without states.
pub fn machine_states(machine: &Value) -> Option<Option<&Map<String, Value>>> {
    let machine = machine.as_object()?;
    match machine.get(MACHINE_STATES) {
        None | Some(Value::Null) => Some(None),
        Some(Value::Object(states)) => Some(Some(states)),
        Some(_) => None,
    }
}

/// The initial state name of a machine, if present and non-empty.
pub fn initial_state(machine: &Value) -> Option<&str> {
    machine
        .get(MACHINE_INITIAL_STATE)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

/// Condition and target of a well-formed rule.
pub fn rule_parts(rule: &Value) -> Option<(&Value, &str)> {
    let rule = rule.as_object()?;
    let condition = rule.get(RULE_CONDITION).filter(|c| !c.is_null())?;
    let target = rule
        .get(RULE_TARGET)
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())?;
    Some((condition, target))
}

/// A fragment the runtime will skip or treat as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Location in the document, e.g. `s.fan.s.on.r[1]`.
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Lists every fragment the runtime would silently skip.
pub fn inspect(definition: &Value, max_machines: usize) -> Vec<Issue> {
    let mut issues = Issues::default();

    let Some(root) = definition.as_object() else {
        issues.push("$", "definition is not an object");
        return issues.0;
    };

    for key in [INIT_ACTIONS, BEFORE_ACTIONS, AFTER_ACTIONS] {
        issues.check_actions(key, root.get(key));
    }

    let machines = match root.get(MACHINES) {
        None | Some(Value::Null) => return issues.0,
        Some(Value::Object(machines)) => machines,
        Some(_) => {
            issues.push(MACHINES, "machines map is not an object");
            return issues.0;
        }
    };

    let mut loaded = 0;
    for (name, machine) in machines {
        let path = format!("{}.{}", MACHINES, name);
        let Some(states) = machine_states(machine) else {
            let reason = if machine.is_object() {
                "states map is not an object; machine skipped"
            } else {
                "machine is not an object; machine skipped"
            };
            issues.push(&path, reason);
            continue;
        };

        if loaded >= max_machines {
            issues.push(
                &path,
                format!("beyond capacity of {} machines; ignored", max_machines),
            );
            continue;
        }
        loaded += 1;

        issues.inspect_machine(&path, machine, states);
    }

    issues.0
}

#[derive(Default)]
struct Issues(Vec<Issue>);

impl Issues {
    fn push(&mut self, path: &str, reason: impl Into<String>) {
        self.0.push(Issue {
            path: path.to_string(),
            reason: reason.into(),
        });
    }

    fn check_actions(&mut self, path: &str, actions: Option<&Value>) {
        match actions {
            None | Some(Value::Null) | Some(Value::Array(_)) => {}
            Some(_) => self.push(path, "actions are not an array"),
        }
    }

    fn inspect_machine(
        &mut self,
        path: &str,
        machine: &Value,
        states: Option<&Map<String, Value>>,
    ) {
        for key in [MACHINE_INITIAL_ACTIONS, MACHINE_BEFORE_ACTIONS] {
            self.check_actions(&format!("{}.{}", path, key), machine.get(key));
        }

        let known: HashSet<&str> = states
            .map(|s| s.keys().map(String::as_str).collect())
            .unwrap_or_default();

        match initial_state(machine) {
            None => self.push(path, "no initial state; machine disabled"),
            Some(initial) if !known.contains(initial) => self.push(
                path,
                format!("initial state '{}' is not defined", initial),
            ),
            Some(_) => {}
        }

        let Some(states) = states else {
            return;
        };

        for (state_name, state) in states {
            let state_path = format!("{}.{}.{}", path, MACHINE_STATES, state_name);
            let Some(state) = state.as_object() else {
                self.push(&state_path, "state is not an object");
                continue;
            };
            self.check_actions(
                &format!("{}.{}", state_path, STATE_ENTRY_ACTIONS),
                state.get(STATE_ENTRY_ACTIONS),
            );

            let rules = match state.get(STATE_RULES) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(rules)) => rules,
                Some(_) => {
                    self.push(&state_path, "rules are not an array");
                    continue;
                }
            };

            for (i, rule) in rules.iter().enumerate() {
                let rule_path = format!("{}.{}[{}]", state_path, STATE_RULES, i);
                match rule_parts(rule) {
                    None if !rule.is_object() => self.push(&rule_path, "rule is not an object"),
                    None => self.push(&rule_path, "rule needs a condition and a target"),
                    Some((_, target)) => {
                        if !known.contains(target) {
                            self.push(
                                &rule_path,
                                format!("target state '{}' is not defined", target),
                            );
                        }
                        self.check_actions(
                            &format!("{}.{}", rule_path, RULE_EXIT_ACTIONS),
                            rule.get(RULE_EXIT_ACTIONS),
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "s": {
                "fan": {
                    "i": "off",
                    "s": {
                        "off": {"r": [{"i": {"gt": ["temp", 30]}, "t": "on"}]},
                        "on": {"r": [{"i": {"lt": ["temp", 25]}, "t": "off", "a": ["beep"]}]}
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse() {
        let value = parse(r#"{"s": {}}"#).unwrap();
        assert!(value.is_object());

        assert!(matches!(parse("[1, 2]"), Err(CoreError::InvalidDefinition { .. })));
        assert!(matches!(parse("{oops"), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_parse_preserves_document_order() {
        let value = parse(r#"{"s": {"zeta": {}, "alpha": {}, "mid": {}}}"#).unwrap();
        let names: Vec<_> = value["s"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_checksum_is_stable() {
        let a = checksum(&sample());
        let b = checksum(&sample());
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, checksum(&json!({"s": {}})));
    }

    #[test]
    fn test_rule_parts() {
        let cond = json!({"gt": [1, 0]});
        assert_eq!(
            rule_parts(&json!({"i": cond.clone(), "t": "b"})),
            Some((&cond, "b"))
        );
        assert_eq!(rule_parts(&json!({"i": true})), None);
        assert_eq!(rule_parts(&json!({"i": null, "t": "b"})), None);
        assert_eq!(rule_parts(&json!({"i": true, "t": ""})), None);
        assert_eq!(rule_parts(&json!({"i": true, "t": 3})), None);
        assert_eq!(rule_parts(&json!("rule")), None);
    }

    #[test]
    fn test_clean_definition_has_no_issues() {
        assert!(inspect(&sample(), 16).is_empty());
        assert!(inspect(&json!({}), 16).is_empty());
    }

    #[test]
    fn test_inspect_reports_skipped_fragments() {
        let definition = json!({
            "i": "setup",
            "s": {
                "scalar": 42,
                "bad_states": {"i": "a", "s": [1]},
                "no_initial": {"s": {"a": {}}},
                "dangling": {
                    "i": "missing",
                    "s": {
                        "a": {"r": [
                            "not a rule",
                            {"t": "a"},
                            {"i": true, "t": "nowhere"}
                        ]},
                        "b": 7,
                        "c": {"r": {}}
                    }
                }
            }
        });

        let issues: Vec<String> = inspect(&definition, 16).iter().map(|i| i.to_string()).collect();
        assert_eq!(
            issues,
            vec![
                "i: actions are not an array",
                "s.scalar: machine is not an object; machine skipped",
                "s.bad_states: states map is not an object; machine skipped",
                "s.no_initial: no initial state; machine disabled",
                "s.dangling: initial state 'missing' is not defined",
                "s.dangling.s.a.r[0]: rule is not an object",
                "s.dangling.s.a.r[1]: rule needs a condition and a target",
                "s.dangling.s.a.r[2]: target state 'nowhere' is not defined",
                "s.dangling.s.b: state is not an object",
                "s.dangling.s.c: rules are not an array",
            ]
        );
    }

    #[test]
    fn test_inspect_reports_capacity() {
        let definition = json!({
            "s": {
                "bad": 1,
                "m1": {"i": "a", "s": {"a": {}}},
                "m2": {"i": "a", "s": {"a": {}}},
                "m3": {"i": "a", "s": {"a": {}}}
            }
        });

        let issues = inspect(&definition, 2);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].path, "s.m3");
        assert!(issues[1].reason.contains("capacity"));
    }
}
