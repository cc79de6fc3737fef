//! Built-in actions, functions and the `sys` plugin.
//!
//! | name        | kind      | behavior                                       |
//! |-------------|-----------|------------------------------------------------|
//! | `log`       | action    | logs each evaluated parameter                  |
//! | `dump`      | action    | logs every variable in the store               |
//! | `round`     | math      | nearest integer                                |
//! | `floor`     | math      | largest integer not above                      |
//! | `ceil`      | math      | smallest integer not below                     |
//! | `clamp`     | math      | `[x, lo, hi]` limited to `lo..=hi`             |
//! | `between`   | condition | `[x, lo, hi]` is `lo <= x <= hi`               |
//! | `sys.uptime`| action    | stores the current tick in `sys.uptime`        |

use smctl_core::{ActionContext, Comparison, Controller, Numeric, Plugin};

/// Registers every built-in on `controller`.
pub fn install(controller: &mut Controller) {
    controller.register_action("log", log);
    controller.register_action("dump", dump);
    controller.register_function("round", |ctx| integral(ctx, f64::round));
    controller.register_function("floor", |ctx| integral(ctx, f64::floor));
    controller.register_function("ceil", |ctx| integral(ctx, f64::ceil));
    controller.register_function("clamp", clamp);
    controller.register_condition("between", between);
    controller.register_plugin(sys_plugin());
}

/// The `sys` plugin.
pub fn sys_plugin() -> Plugin {
    Plugin::new("sys").with_action("uptime", |ctx| {
        let now = ctx.now();
        ctx.set_var("uptime", now);
    })
}

fn log(ctx: &mut ActionContext<'_>) {
    let mut parts = Vec::with_capacity(ctx.param_count());
    for i in 0..ctx.param_count() {
        let value = ctx.param_as_numeric(i, Numeric::NaN);
        match ctx.param_raw(i).and_then(|raw| raw.as_str()) {
            Some(name) => parts.push(format!("{}={}", name, value)),
            None => parts.push(value.to_string()),
        }
    }
    tracing::info!(target: "smctl::log", "{}", parts.join(" "));
}

fn dump(ctx: &mut ActionContext<'_>) {
    for (name, value) in ctx.compute().store().iter() {
        tracing::info!(target: "smctl::dump", var = name, %value);
    }
}

fn integral(ctx: &mut ActionContext<'_>, op: fn(f64) -> f64) -> Numeric {
    match ctx.param_as_numeric(0, Numeric::Long(0)) {
        Numeric::Float(f) => Numeric::Long(Numeric::Float(op(f)).as_i64()),
        other => other,
    }
}

fn clamp(ctx: &mut ActionContext<'_>) -> Numeric {
    let x = ctx.param_as_numeric(0, Numeric::Long(0));
    let lo = ctx.param_as_numeric(1, x);
    let hi = ctx.param_as_numeric(2, x);
    x.max(lo).min(hi)
}

fn between(ctx: &mut ActionContext<'_>) -> bool {
    if ctx.param_count() < 3 {
        return false;
    }
    let x = ctx.param_as_numeric(0, Numeric::NaN);
    let lo = ctx.param_as_numeric(1, Numeric::NaN);
    let hi = ctx.param_as_numeric(2, Numeric::NaN);
    lo.compare(Comparison::Lte, x) && x.compare(Comparison::Lte, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smctl_core::ControllerConfig;
    use std::cell::Cell;
    use std::rc::Rc;

    fn controller() -> Controller {
        let mut controller = Controller::new(ControllerConfig::default());
        install(&mut controller);
        controller
    }

    #[test]
    fn test_rounding() {
        let mut c = controller();
        assert_eq!(c.eval_math(&json!({"round": [2.5]})), Numeric::Long(3));
        assert_eq!(c.eval_math(&json!({"round": [-2.4]})), Numeric::Long(-2));
        assert_eq!(c.eval_math(&json!({"floor": [2.9]})), Numeric::Long(2));
        assert_eq!(c.eval_math(&json!({"ceil": [2.1]})), Numeric::Long(3));
        assert_eq!(c.eval_math(&json!({"floor": [7]})), Numeric::Long(7));
        assert!(c.eval_math(&json!({"round": [{"sqrt": [-1]}]})).is_nan());
        assert_eq!(c.eval_math(&json!({"round": []})), Numeric::Long(0));
    }

    #[test]
    fn test_clamp() {
        let mut c = controller();
        assert_eq!(c.eval_math(&json!({"clamp": [15, 0, 10]})), Numeric::Long(10));
        assert_eq!(c.eval_math(&json!({"clamp": [-3, 0, 10]})), Numeric::Long(0));
        assert_eq!(c.eval_math(&json!({"clamp": [4.5, 0, 10]})), Numeric::Float(4.5));
        assert_eq!(c.eval_math(&json!({"clamp": [4]})), Numeric::Long(4));
    }

    #[test]
    fn test_between() {
        let mut c = controller();
        c.set_var("humidity", 55);
        assert!(c.eval_condition(&json!({"between": ["humidity", 40, 60]})));
        assert!(c.eval_condition(&json!({"between": [40, 40, 60]})));
        assert!(!c.eval_condition(&json!({"between": [61, 40, 60]})));
        assert!(!c.eval_condition(&json!({"between": [50, 40]})));
    }

    #[test]
    fn test_sys_uptime() {
        let time = Rc::new(Cell::new(0));
        let t = time.clone();
        let mut c = Controller::new(ControllerConfig::default()).with_clock(move || t.get());
        install(&mut c);

        time.set(1234);
        assert_eq!(c.run_action(&json!("sys.uptime")), 1);
        assert_eq!(c.get_var_int("sys.uptime", 0), 1234);
        assert_eq!(c.get_var_int("sm.sys.uptime", 0), 1234);
    }

    #[test]
    fn test_log_and_dump_run() {
        let mut c = controller();
        c.set_var("x", 1);
        assert_eq!(c.run_action(&json!({"log": ["x", 2, {"sum": [1, 2]}]})), 1);
        assert_eq!(c.run_action(&json!("dump")), 1);
    }
}
