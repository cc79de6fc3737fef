//! Command implementations.

use colored::Colorize;
use serde_json::Value;
use smctl_core::{definition, Controller, ControllerConfig, Numeric};
use smctl_host::{
    build_controller, builtins, load_definition, Config, HostError, MonotonicClock, Runner,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Runs the cycle loop on a dedicated thread until Ctrl+C or the cycle limit.
pub async fn run(
    config_path: Option<PathBuf>,
    definition_path: Option<PathBuf>,
    cycles: Option<u64>,
    snapshot: bool,
) -> CommandResult {
    let mut config = Config::load_from(config_path.as_deref())?;
    if let Some(path) = config_path {
        tracing::info!("Loaded config from {}", path.display());
    }
    if let Some(path) = definition_path {
        config.definition.path = Some(path);
    }
    if cycles.is_some() {
        config.runtime.max_cycles = cycles;
    }

    let path = config
        .definition
        .path
        .clone()
        .ok_or(HostError::MissingDefinition)?;
    let definition = load_definition(&path)?;

    tracing::info!("Starting smctl");
    tracing::info!("  Device: {}", config.controller.device_id);
    tracing::info!("  Definition: {}", path.display());
    tracing::info!("  Capacity: {} machines", config.controller.max_machines);
    match config.runtime.max_cycles {
        Some(n) => tracing::info!("  Cycle limit: {}", n),
        None => tracing::info!("  Cycle limit: none"),
    }

    let stop = Arc::new(AtomicBool::new(false));

    // The controller is single-threaded; it is built and driven on its own thread.
    let worker = {
        let stop = stop.clone();
        std::thread::Builder::new()
            .name("controller".to_string())
            .spawn(move || -> Result<Value, HostError> {
                let mut controller = build_controller(&config, stop.clone());
                controller.initialize(definition);
                let mut runner =
                    Runner::new(controller, stop).with_max_cycles(config.runtime.max_cycles);
                runner.run();
                runner.snapshot()
            })?
    };

    let shutdown = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping controller...");
        shutdown.store(true, Ordering::SeqCst);
    });

    let state = tokio::task::spawn_blocking(move || worker.join())
        .await?
        .map_err(|_| "controller thread panicked")??;

    let cycles = state["cycles"].as_u64().unwrap_or(0);
    println!(
        "{} after {} cycle(s)",
        "Stopped".green(),
        cycles.to_string().cyan()
    );
    if snapshot {
        println!("{}", format_json(&state));
    }

    tracing::info!("Controller stopped");
    Ok(())
}

/// Parses a definition and lists the fragments the runtime would skip.
pub fn check(file: &Path, max_machines: usize) -> CommandResult {
    let document = load_definition(file)?;

    let machines = document
        .get(definition::MACHINES)
        .and_then(Value::as_object)
        .map(|m| m.len())
        .unwrap_or(0);

    println!(
        "{} {} ({} machine(s), checksum {})",
        "Parsed".green(),
        file.display().to_string().cyan(),
        machines,
        definition::checksum(&document).dimmed()
    );

    let issues = definition::inspect(&document, max_machines);
    if issues.is_empty() {
        println!("{}", "No issues found".green());
    } else {
        for issue in &issues {
            println!("  {} {}", "warning:".yellow(), issue);
        }
        println!("{} issue(s)", issues.len().to_string().yellow());
    }
    Ok(())
}

/// Evaluates one expression against a controller with the built-ins.
pub fn eval(
    expr: &str,
    condition: bool,
    vars: Vec<(String, Numeric)>,
    device_id: String,
) -> CommandResult {
    let node = parse_expr(expr)?;

    let clock = MonotonicClock::new();
    let mut controller = Controller::new(ControllerConfig {
        device_id,
        ..Default::default()
    })
    .with_clock(move || clock.now());
    builtins::install(&mut controller);

    for (name, value) in vars {
        controller.set_var(&name, value);
    }

    if condition {
        if controller.eval_condition(&node) {
            println!("{}", "true".green());
        } else {
            println!("{}", "false".red());
        }
    } else {
        println!("{}", controller.eval_math(&node));
    }
    Ok(())
}

/// Parses `name=value` where value is a JSON number.
pub fn parse_var(arg: &str) -> Result<(String, Numeric), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    if name.is_empty() {
        return Err("variable name must not be empty".to_string());
    }
    let number = serde_json::from_str::<Value>(value.trim())
        .ok()
        .and_then(|v| Numeric::from_json(&v).filter(|_| v.is_number()))
        .ok_or_else(|| format!("'{}' is not a number", value))?;
    Ok((name.to_string(), number))
}

/// Parses an expression argument. Text that is not JSON is taken as a
/// variable name.
fn parse_expr(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&content)?);
    }
    Ok(serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string())))
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
