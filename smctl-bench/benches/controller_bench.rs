//! Full cycle benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use smctl_core::{Controller, ControllerConfig};

fn toggle_machine(index: usize) -> Value {
    json!({
        "i": "off",
        "b": [{":=": [format!("ticks_{}", index), {"sum": [format!("ticks_{}", index), 1]}]}],
        "s": {
            "off": {
                "a": [{":=": [format!("out_{}", index), 0]}],
                "r": [{"i": {"gt": [format!("ticks_{}", index), 0]}, "t": "on"}]
            },
            "on": {
                "a": [{":=": [format!("out_{}", index), 1]}],
                "r": [{"i": true, "t": "off"}]
            }
        }
    })
}

fn create_controller(machines: usize) -> Controller {
    let config = ControllerConfig {
        device_id: "bench".to_string(),
        max_machines: machines,
        default_sleep: 0,
    };
    let mut controller = Controller::new(config);

    let machines: serde_json::Map<String, Value> = (0..machines)
        .map(|i| (format!("machine_{}", i), toggle_machine(i)))
        .collect();
    controller.initialize(json!({ "s": machines }));
    controller
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_cycle");

    for machines in [1, 4, 16] {
        let mut controller = create_controller(machines);
        group.throughput(Throughput::Elements(machines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(machines), &machines, |b, _| {
            b.iter(|| black_box(controller.cycle()))
        });
    }

    group.finish();
}

fn bench_initialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_initialize");

    let machines: serde_json::Map<String, Value> = (0..16)
        .map(|i| (format!("machine_{}", i), toggle_machine(i)))
        .collect();
    let definition = json!({ "s": machines });
    let mut controller = Controller::new(ControllerConfig::default());

    group.bench_function("16_machines", |b| {
        b.iter(|| controller.initialize(black_box(definition.clone())))
    });

    group.finish();
}

criterion_group!(benches, bench_cycle, bench_initialize);

criterion_main!(benches);
