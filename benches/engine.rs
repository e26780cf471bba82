use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use chainfx::audio::buffer::AudioBuffer;
use chainfx::audio::engine::{Engine, EngineConfig, EngineHandle};
use chainfx::fx::order::DspOrder;
use chainfx::fx::stages::ProcessSpec;
use chainfx::params::ParameterSet;

const SAMPLE_RATE: f32 = 48000.0;
const BUFFER_SIZE: usize = 128;

fn build_engine(channels: usize, smoothing_ms: f32) -> (Engine, EngineHandle) {
    let config = EngineConfig {
        param_smoothing_ms: smoothing_ms,
        ..EngineConfig::default()
    };
    let (mut engine, handle) = Engine::new(Arc::new(ParameterSet::new()), config);
    engine.prepare(ProcessSpec::new(SAMPLE_RATE, BUFFER_SIZE, channels));
    (engine, handle)
}

fn bench_engine_channels(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine Channels");

    for &channels in &[1usize, 2, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(channels),
            &channels,
            |b, &channels| {
                let (mut engine, _handle) = build_engine(channels, 0.0);
                let mut buffer = AudioBuffer::new(channels, BUFFER_SIZE);
                buffer.fill(0.25);
                b.iter(|| engine.process(black_box(&mut buffer)));
            },
        );
    }

    group.finish();
}

fn bench_engine_reorder(c: &mut Criterion) {
    let orders: Vec<DspOrder> = [
        "phaser,chorus,overdrive,ladder,filter",
        "filter,ladder,overdrive,chorus,phaser",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect();

    c.bench_function("Engine Reorder Every Block", |b| {
        let (mut engine, mut handle) = build_engine(2, 0.0);
        let mut buffer = AudioBuffer::new(2, BUFFER_SIZE);
        let mut i = 0;
        b.iter(|| {
            handle.push_order(orders[i % orders.len()]);
            engine.process(black_box(&mut buffer));
            while handle.pull_announced_order().is_some() {}
            i += 1;
        });
    });
}

fn bench_engine_smoothing(c: &mut Criterion) {
    c.bench_function("Engine Smoothing", |b| {
        let (mut engine, _handle) = build_engine(2, 20.0);
        let mut buffer = AudioBuffer::new(2, BUFFER_SIZE);
        b.iter(|| engine.process(black_box(&mut buffer)));
    });
}

criterion_group!(
    benches,
    bench_engine_channels,
    bench_engine_reorder,
    bench_engine_smoothing
);
criterion_main!(benches);
