//! Expression evaluation.
//!
//! Expressions are JSON trees. Scalars evaluate to themselves, strings name
//! variables, and single-key objects apply an operator to their operands:
//!
//! ```json
//! {"and": [
//!   {"gt": ["garage.humidity", 30]},
//!   {"elapsed": ["fan-timer", {"mul": ["ctrl.fan-min-off", 1000]}]}
//! ]}
//! ```
//!
//! Operator names match case-insensitively. Anything malformed degrades to
//! a neutral value (`false` / `Long 0`) instead of failing.
//!
//! Condition operators: `not`, `and`, `or`, `gt`, `gte`, `lt`, `lte`, `eq`,
//! `ne`, `elapsed`, then registered custom conditions.
//!
//! Math operators: `ticks`; `sqrt`, `exp`, `ln`, `log`, `abs`, `neg`; `sub`,
//! `div`, `pow`, `diff`; `?`; `sum`, `mul`, `min`, `max`, then registered
//! custom math functions.

use crate::context::ActionContext;
use crate::key::NameMap;
use crate::store::Store;
use crate::timers::{Ticks, Timers};
use crate::value::{Comparison, Numeric};
use serde_json::Value;
use std::rc::Rc;

/// A native math function callable from expressions.
pub type MathFn = Rc<dyn Fn(&mut ActionContext<'_>) -> Numeric>;

/// A native boolean function callable from conditions.
pub type ConditionFn = Rc<dyn Fn(&mut ActionContext<'_>) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionOp {
    Not,
    And,
    Or,
    Compare(Comparison),
    Elapsed,
}

impl ConditionOp {
    fn parse(name: &str) -> Option<Self> {
        const OPS: [(&str, ConditionOp); 10] = [
            ("not", ConditionOp::Not),
            ("and", ConditionOp::And),
            ("or", ConditionOp::Or),
            ("gt", ConditionOp::Compare(Comparison::Gt)),
            ("gte", ConditionOp::Compare(Comparison::Gte)),
            ("lt", ConditionOp::Compare(Comparison::Lt)),
            ("lte", ConditionOp::Compare(Comparison::Lte)),
            ("eq", ConditionOp::Compare(Comparison::Eq)),
            ("ne", ConditionOp::Compare(Comparison::Ne)),
            ("elapsed", ConditionOp::Elapsed),
        ];
        OPS.iter()
            .find(|(token, _)| token.eq_ignore_ascii_case(name))
            .map(|(_, op)| *op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathOp {
    Ticks,
    Sqrt,
    Exp,
    Ln,
    Log,
    Abs,
    Neg,
    Sub,
    Div,
    Pow,
    Diff,
    Cond,
    Sum,
    Mul,
    Min,
    Max,
}

impl MathOp {
    fn parse(name: &str) -> Option<Self> {
        const OPS: [(&str, MathOp); 16] = [
            ("ticks", MathOp::Ticks),
            ("sqrt", MathOp::Sqrt),
            ("exp", MathOp::Exp),
            ("ln", MathOp::Ln),
            ("log", MathOp::Log),
            ("abs", MathOp::Abs),
            ("neg", MathOp::Neg),
            ("sub", MathOp::Sub),
            ("div", MathOp::Div),
            ("pow", MathOp::Pow),
            ("diff", MathOp::Diff),
            ("?", MathOp::Cond),
            ("sum", MathOp::Sum),
            ("mul", MathOp::Mul),
            ("min", MathOp::Min),
            ("max", MathOp::Max),
        ];
        OPS.iter()
            .find(|(token, _)| token.eq_ignore_ascii_case(name))
            .map(|(_, op)| *op)
    }
}

/// The expression engine together with the state it reads and writes.
pub struct Compute {
    store: Store,
    timers: Timers,
    functions: NameMap<MathFn>,
    conditions: NameMap<ConditionFn>,
}

impl Compute {
    /// Creates an engine whose local variables are scoped by `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            store: Store::new(scope),
            timers: Timers::new(),
            functions: NameMap::new(),
            conditions: NameMap::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    /// Registers a custom math function. The last registration wins.
    pub fn register_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) -> Numeric + 'static,
    {
        self.functions.insert(name, Rc::new(f));
    }

    /// Registers a custom condition. The last registration wins.
    pub fn register_condition<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut ActionContext<'_>) -> bool + 'static,
    {
        self.conditions.insert(name, Rc::new(f));
    }

    /// Writes a local variable.
    pub fn set_var(&mut self, name: &str, value: impl Into<Numeric>) {
        self.store.set_var(name, value.into(), true);
    }

    pub fn get_var_int(&self, name: &str, default: i64) -> i64 {
        self.store.get_var_int(name, default)
    }

    pub fn get_var_float(&self, name: &str, default: f64) -> f64 {
        self.store.get_var_float(name, default)
    }

    /// Evaluates a node as a condition.
    pub fn eval_condition(&mut self, node: &Value) -> bool {
        match node {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(_) => Numeric::from_json(node)
                .map(|n| n.is_truthy())
                .unwrap_or(false),
            Value::String(name) => !name.is_empty() && self.store.get_var_int(name, 0) != 0,
            Value::Array(_) => false,
            Value::Object(map) => match map.iter().next() {
                Some((op, operands)) if !op.is_empty() => self.switch_condition(op, operands),
                _ => false,
            },
        }
    }

    /// Applies condition operator `op` to `operands`.
    pub fn switch_condition(&mut self, op: &str, operands: &Value) -> bool {
        tracing::trace!(op, %operands, "condition");

        let Some(decoded) = ConditionOp::parse(op) else {
            return self.call_condition(op, operands);
        };

        if decoded == ConditionOp::Not {
            return match operands {
                Value::Array(items) => match items.first() {
                    Some(first) => !self.eval_condition(first),
                    None => false,
                },
                other => !self.eval_condition(other),
            };
        }

        let Value::Array(items) = operands else {
            return false;
        };

        match decoded {
            ConditionOp::And => items.iter().all(|item| self.eval_condition(item)),
            ConditionOp::Or => items.iter().any(|item| self.eval_condition(item)),
            ConditionOp::Compare(cmp) => {
                if items.len() < 2 {
                    return false;
                }
                let lhs = self.eval_math(&items[0]);
                let rhs = self.eval_math(&items[1]);
                lhs.compare(cmp, rhs)
            }
            ConditionOp::Elapsed => self.check_elapsed(items),
            ConditionOp::Not => unreachable!("handled above"),
        }
    }

    /// Evaluates a node as a number.
    pub fn eval_math(&mut self, node: &Value) -> Numeric {
        match node {
            Value::Null => Numeric::default(),
            Value::Bool(_) | Value::Number(_) => Numeric::from_json(node).unwrap_or_default(),
            Value::String(name) => {
                if name.is_empty() {
                    Numeric::default()
                } else {
                    self.store.get_var(name).unwrap_or_default()
                }
            }
            Value::Array(items) => match items.first() {
                Some(first) => self.eval_math(first),
                None => Numeric::default(),
            },
            Value::Object(map) => match map.iter().next() {
                Some((op, operands)) if !op.is_empty() => self.switch_math(op, operands),
                _ => Numeric::default(),
            },
        }
    }

    fn switch_math(&mut self, op: &str, operands: &Value) -> Numeric {
        tracing::trace!(op, %operands, "math");

        let Some(decoded) = MathOp::parse(op) else {
            return self.call_function(op, operands);
        };

        match decoded {
            MathOp::Ticks => Numeric::from(self.timers.now()),

            MathOp::Sqrt | MathOp::Exp | MathOp::Ln | MathOp::Log | MathOp::Abs | MathOp::Neg => {
                let operand = self.eval_math(operands);
                unary(decoded, operand)
            }

            MathOp::Sub | MathOp::Div | MathOp::Pow | MathOp::Diff => {
                let Value::Array(items) = operands else {
                    return self.eval_math(operands);
                };
                match items.as_slice() {
                    [] => Numeric::default(),
                    [only] => {
                        let value = self.eval_math(only);
                        if decoded == MathOp::Sub {
                            -value
                        } else {
                            value
                        }
                    }
                    [a, b, ..] => {
                        let a = self.eval_math(a);
                        let b = self.eval_math(b);
                        match decoded {
                            MathOp::Sub => a - b,
                            MathOp::Div => a / b,
                            MathOp::Pow => a.pow(b),
                            _ => Numeric::from(Timers::diff(to_ticks(a), to_ticks(b))),
                        }
                    }
                }
            }

            MathOp::Cond => {
                let Value::Array(items) = operands else {
                    return Numeric::default();
                };
                match items.as_slice() {
                    [] | [_] => Numeric::default(),
                    [cond, then] => {
                        if self.eval_condition(cond) {
                            self.eval_math(then)
                        } else {
                            Numeric::default()
                        }
                    }
                    [cond, then, otherwise, ..] => {
                        if self.eval_condition(cond) {
                            self.eval_math(then)
                        } else {
                            self.eval_math(otherwise)
                        }
                    }
                }
            }

            MathOp::Sum | MathOp::Mul | MathOp::Min | MathOp::Max => {
                let Value::Array(items) = operands else {
                    return Numeric::default();
                };
                match decoded {
                    MathOp::Sum => items
                        .iter()
                        .fold(Numeric::Long(0), |acc, item| acc + self.eval_math(item)),
                    MathOp::Mul => items
                        .iter()
                        .fold(Numeric::Long(1), |acc, item| acc * self.eval_math(item)),
                    _ => {
                        let mut values = items.iter().map(|item| self.eval_math(item));
                        let Some(first) = values.next() else {
                            return Numeric::default();
                        };
                        if decoded == MathOp::Min {
                            values.fold(first, Numeric::min)
                        } else {
                            values.fold(first, Numeric::max)
                        }
                    }
                }
            }
        }
    }

    fn check_elapsed(&mut self, items: &[Value]) -> bool {
        if items.len() < 2 || !self.timers.has_clock() {
            return true;
        }
        let Value::String(name) = &items[0] else {
            return true;
        };
        if name.is_empty() {
            return true;
        }

        let timeout = to_ticks_saturating(self.eval_math(&items[1]));
        self.timers.validate_timer(name, timeout)
    }

    fn call_function(&mut self, name: &str, operands: &Value) -> Numeric {
        let Some(f) = self.functions.get(name).cloned() else {
            tracing::debug!(op = name, "unknown math operator");
            return Numeric::default();
        };
        let mut ctx = ActionContext::new(self, operand_list(operands));
        f(&mut ctx).normalize()
    }

    fn call_condition(&mut self, name: &str, operands: &Value) -> bool {
        let Some(f) = self.conditions.get(name).cloned() else {
            tracing::debug!(op = name, "unknown condition operator");
            return false;
        };
        let mut ctx = ActionContext::new(self, operand_list(operands));
        f(&mut ctx)
    }
}

fn unary(op: MathOp, operand: Numeric) -> Numeric {
    if operand.is_nan() {
        return Numeric::NaN;
    }
    let x = operand.as_f64();
    match op {
        MathOp::Sqrt if x < 0.0 => Numeric::NaN,
        MathOp::Sqrt => Numeric::float(x.sqrt()),
        MathOp::Exp => Numeric::float(x.exp()),
        MathOp::Ln | MathOp::Log if x <= 0.0 => Numeric::NaN,
        MathOp::Ln => Numeric::float(x.ln()),
        MathOp::Log => Numeric::float(x.log10()),
        MathOp::Abs => operand.abs(),
        _ => -operand,
    }
}

/// Operands of a custom function: the array itself, a lone scalar as a
/// one-element list, or nothing for `null`.
fn operand_list(operands: &Value) -> &[Value] {
    match operands {
        Value::Array(items) => items,
        Value::Null => &[],
        other => std::slice::from_ref(other),
    }
}

/// Timestamps wrap like the device counter.
fn to_ticks(value: Numeric) -> Ticks {
    value.as_i64() as Ticks
}

/// Timeouts clamp into the tick range.
fn to_ticks_saturating(value: Numeric) -> Ticks {
    value.as_i64().clamp(0, i64::from(Ticks::MAX)) as Ticks
}
