// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the observer callback path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};
use model_ir::{ModelFormat, NodeDescriptor};
use observer::{
    EventFlags, InspectorMode, InspectorSink, NoOutputs, ObserverOptions, PushedOutputs,
    RecordBuffer,
};
use tensor_core::{DType, Shape4, TensorLayout, TensorView};

const N_NODES: usize = 32;

fn nodes() -> Vec<NodeDescriptor> {
    (0..N_NODES)
        .map(|index| NodeDescriptor {
            index,
            name: format!("conv_{index}"),
            format: ModelFormat::Portable,
            code: 3,
            version: 1,
            id: index as i32,
            outputs: vec![index + 1],
        })
        .collect()
}

fn clock() -> (SimulatedCounter, CycleClock) {
    let counter = SimulatedCounter::new();
    let clock = CycleClock::new(counter.clone(), ClockConfig::default()).expect("clock");
    clock.start();
    (counter, clock)
}

fn bench_timing_only(c: &mut Criterion) {
    let nodes = nodes();
    let (counter, clock) = clock();
    let mut obs = ObserverOptions::new()
        .time_source(clock)
        .build(N_NODES)
        .expect("observer");
    obs.start();

    c.bench_function("observer_invocation_32_nodes", |b| {
        b.iter(|| {
            obs.begin_invocation();
            for node in &nodes {
                let pos = EventFlags::position(node.index, N_NODES);
                obs.on_event(EventFlags::PRE | pos, node, &mut NoOutputs);
                counter.advance(100);
                obs.on_event(EventFlags::POST | pos, node, &mut NoOutputs);
            }
            black_box(obs.end_invocation())
        })
    });
}

fn bench_inspector(c: &mut Criterion) {
    let nodes = nodes();
    let (counter, clock) = clock();
    let buffer = RecordBuffer::new();
    let sink = InspectorSink::new(
        InspectorMode::WithData,
        ClockConfig::default(),
        buffer.clone(),
    );
    let mut obs = ObserverOptions::new()
        .time_source(clock)
        .sink(sink)
        .build(N_NODES)
        .expect("observer");
    obs.start();

    let data = vec![0u8; 1024];
    let layout = TensorLayout::new(DType::I8, Shape4::new(1, 16, 16, 4), None);
    let views = [TensorView::new(1, layout, &data).expect("view")];

    c.bench_function("inspector_invocation_32_nodes", |b| {
        b.iter(|| {
            obs.begin_invocation();
            for node in &nodes {
                let pos = EventFlags::position(node.index, N_NODES);
                obs.on_event(EventFlags::PRE | pos, node, &mut NoOutputs);
                counter.advance(100);
                obs.on_event(EventFlags::POST | pos, node, &mut PushedOutputs(&views));
            }
            let t = obs.end_invocation();
            black_box(buffer.take());
            t
        })
    });
}

criterion_group!(benches, bench_timing_only, bench_inspector);
criterion_main!(benches);
