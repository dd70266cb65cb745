//! Criterion benchmarks for the pulso-core scheduling engine.
//!
//! Measures graph overhead independently of DSP cost using trivial units.
//! Two axes:
//!
//! - **Compile** — terminal-rooted walk + implicit-add synthesis + buffer
//!   binding, at varying chain lengths and fan-in widths
//! - **Execute** — `process_block()` throughput over the compiled schedule
//!
//! Run with: `cargo bench -p pulso-core`
#![allow(missing_docs)]

use core::ops::Range;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pulso_core::{PortKind, ProcessContext, SignalIo, Unit, UnitGraph, UnitId};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 64;
const CHAIN_LENGTHS: &[usize] = &[4, 16, 64];
const FAN_INS: &[usize] = &[2, 4, 8];

/// Trivial source — isolates graph overhead from DSP cost.
struct Dc(f32);

impl Unit for Dc {
    fn signal_outlets(&self) -> usize {
        1
    }
    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let out = io.outlet(0);
        for i in range {
            out[i] = self.0;
        }
    }
}

/// Trivial gain stage.
struct Scale(f32);

impl Unit for Scale {
    fn signal_inlets(&self) -> usize {
        1
    }
    fn signal_outlets(&self) -> usize {
        1
    }
    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let input = io.inlet(0);
        let out = io.outlet(0);
        for i in range {
            out[i] = input[i] * self.0;
        }
    }
}

/// Source → n gain stages → terminal.
fn make_chain(n: usize) -> (UnitGraph, UnitId) {
    let mut graph = UnitGraph::new(SAMPLE_RATE, BLOCK_SIZE);
    let src = graph.add_unit(Box::new(Dc(0.5))).unwrap();
    let mut prev = src;
    for _ in 0..n {
        let stage = graph.add_unit(Box::new(Scale(0.9))).unwrap();
        graph.connect(prev, 0, stage, 0, PortKind::Signal).unwrap();
        prev = stage;
    }
    graph.mark_terminal(prev).unwrap();
    (graph, prev)
}

/// n sources converging on a single inlet (n-1 implicit adds).
fn make_fan_in(n: usize) -> (UnitGraph, UnitId) {
    let mut graph = UnitGraph::new(SAMPLE_RATE, BLOCK_SIZE);
    let sink = graph.add_unit(Box::new(Scale(1.0))).unwrap();
    for i in 0..n {
        let src = graph.add_unit(Box::new(Dc(i as f32 * 0.1))).unwrap();
        graph.connect(src, 0, sink, 0, PortKind::Signal).unwrap();
    }
    graph.mark_terminal(sink).unwrap();
    (graph, sink)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/compile");
    for &n in CHAIN_LENGTHS {
        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, &n| {
            b.iter_batched(
                || make_chain(n).0,
                |mut graph| graph.compile().unwrap(),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    for &n in FAN_INS {
        group.bench_with_input(BenchmarkId::new("fan_in", n), &n, |b, &n| {
            b.iter_batched(
                || make_fan_in(n).0,
                |mut graph| graph.compile().unwrap(),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/execute");
    for &n in CHAIN_LENGTHS {
        let (mut graph, _) = make_chain(n);
        graph.compile().unwrap();
        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, _| {
            b.iter(|| graph.process_block());
        });
    }
    for &n in FAN_INS {
        let (mut graph, _) = make_fan_in(n);
        graph.compile().unwrap();
        group.bench_with_input(BenchmarkId::new("fan_in", n), &n, |b, _| {
            b.iter(|| graph.process_block());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
