//! Benchmark suite for the per-event hot path.
//!
//! Run with: `cargo bench`
//!
//! Measures:
//! - Atom computation throughput over a synthetic tape
//! - Signal computation on top of the atom stream
//! - Rolling-window update cost in isolation

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use quantdev::physics::{Atoms, MarketPhysics, RollingMean, ACTION_TRADE};
use quantdev::signals::{SignalEngine, SIGNAL_COUNT};
use quantdev::tape::TbboColumns;

/// A realistic synthetic session: alternating aggressors over a slowly
/// drifting book, 100µs apart.
fn create_test_tape(n: usize) -> TbboColumns {
    let mut cols = TbboColumns::new();
    for i in 0..n {
        let mid = 5000.0 + (i as f64 * 0.001).sin();
        cols.ts_event.push(i as u64 * 100_000);
        cols.ts_recv.push(i as u64 * 100_000 + 300);
        cols.ts_in_delta.push(150);
        cols.prices.push(mid + if i % 2 == 0 { 0.25 } else { -0.25 });
        cols.sizes.push((i % 12 + 1) as f64);
        cols.sides.push(if i % 2 == 0 { 1 } else { -1 });
        cols.actions.push(ACTION_TRADE);
        cols.flags.push(0);
        cols.depth.push(0);
        cols.sequences.push(i as u32);
        cols.bid_px.push(mid - 0.25);
        cols.ask_px.push(mid + 0.25);
        cols.bid_sz.push((i % 80 + 10) as f64);
        cols.ask_sz.push((i % 60 + 15) as f64);
        cols.bid_ct.push((i % 7 + 1) as u32);
        cols.ask_ct.push((i % 5 + 1) as u32);
        cols.publisher_id.push(1);
        cols.instrument_id.push(1);
    }
    cols.count = n;
    cols
}

fn bench_atom_updates(c: &mut Criterion) {
    let cols = create_test_tape(100_000);

    let mut group = c.benchmark_group("physics");
    group.throughput(Throughput::Elements(cols.count as u64 - 1));
    group.bench_function("update_atoms_100k", |b| {
        b.iter(|| {
            let mut mp = MarketPhysics::new(0x80);
            mp.prime(&cols);
            let mut atoms = Atoms::default();
            for i in 1..cols.count {
                mp.update_atoms(i, &cols, &mut atoms);
            }
            black_box(atoms.ofi)
        })
    });
    group.finish();
}

fn bench_signal_compute(c: &mut Criterion) {
    let cols = create_test_tape(10_000);
    let mut mp = MarketPhysics::new(0x80);
    mp.prime(&cols);
    let mut atoms = Atoms::default();
    mp.update_atoms(1, &cols, &mut atoms);

    let engine = SignalEngine::default();
    c.bench_function("signal_compute", |b| {
        b.iter(|| {
            let mut out = [0.0f64; SIGNAL_COUNT];
            engine.compute(black_box(&atoms), &mut out);
            black_box(out)
        })
    });
}

fn bench_rolling_window(c: &mut Criterion) {
    c.bench_function("rolling_mean_64", |b| {
        let mut w = RollingMean::new(64);
        let mut x = 0.0f64;
        b.iter(|| {
            x += 1.0;
            black_box(w.update(x))
        })
    });
}

criterion_group!(
    benches,
    bench_atom_updates,
    bench_signal_compute,
    bench_rolling_window
);
criterion_main!(benches);
