//! End-to-end study scenarios over synthetic tapes: wire → tape →
//! physics → statistics.

use quantdev::config::StudyConfig;
use quantdev::physics::{AtomId, ACTION_TRADE};
use quantdev::signals::SignalId;
use quantdev::stats::{Bucket, ReportCells, StudyAggregator};
use quantdev::study::{run_atom_study, run_signal_backtest, symbol_from_path};
use quantdev::tape::{decode_into, TapeEncoder, TapeRow, TbboColumns};

const MS: u64 = 1_000_000;

/// A liquid synthetic session: one trade every 100ms with a gently
/// drifting book, contiguous sequences.
fn synthetic_tape(n: usize) -> TbboColumns {
    let mut cols = TbboColumns::new();
    for i in 0..n {
        let drift = (i as f64 * 0.01).sin() * 0.5;
        let mid = 5000.0 + drift;
        cols.ts_event.push(i as u64 * 100 * MS);
        cols.ts_recv.push(i as u64 * 100 * MS + 250_000);
        cols.ts_in_delta.push(120);
        cols.prices.push(mid + if i % 2 == 0 { 0.25 } else { -0.25 });
        cols.sizes.push((i % 9 + 1) as f64);
        cols.sides.push(if i % 2 == 0 { 1 } else { -1 });
        cols.actions.push(ACTION_TRADE);
        cols.flags.push(0);
        cols.depth.push(0);
        cols.sequences.push(i as u32 + 1);
        cols.bid_px.push(mid - 0.25);
        cols.ask_px.push(mid + 0.25);
        cols.bid_sz.push((i % 50 + 20) as f64);
        cols.ask_sz.push((i % 40 + 25) as f64);
        cols.bid_ct.push((i % 6 + 2) as u32);
        cols.ask_ct.push((i % 5 + 2) as u32);
        cols.publisher_id.push(1);
        cols.instrument_id.push(7);
    }
    cols.count = n;
    cols
}

#[test]
fn atom_study_fills_both_buckets() {
    let cols = synthetic_tape(2_000);
    let config = StudyConfig::default();
    let mut agg = StudyAggregator::new();
    run_atom_study(&cols, &config, &mut agg);

    // 100ms spacing → the 10s horizon resolves 100 events ahead, so most
    // of the tape gets defined returns in both buckets.
    let is = agg.cell(AtomId::TradeSign, 0, Bucket::InSample).count();
    let oos = agg.cell(AtomId::TradeSign, 0, Bucket::OutOfSample).count();
    assert!(is > 1_000, "in-sample count {is}");
    assert!(oos > 100, "out-of-sample count {oos}");

    // The split is by row count: IS sees ~70% of observations.
    let total = is + oos;
    let is_frac = is as f64 / total as f64;
    assert!(is_frac > 0.6 && is_frac < 0.8, "is_frac {is_frac}");

    // The 30s horizon loses more of the tail than the 10s horizon.
    let long = agg.cell(AtomId::TradeSign, 2, Bucket::OutOfSample).count();
    assert!(long < oos);
}

#[test]
fn signal_backtest_records_observations_and_trades() {
    let cols = synthetic_tape(3_000);
    let config = StudyConfig::default();
    let mut cells = ReportCells::new();
    run_signal_backtest(&cols, &config, 50.0, &mut cells);

    let ic = cells.ic_cell(SignalId::Integrated, 0);
    assert!(ic.count() > 1_000);

    // Alternating aggressors keep OFI alive, so directional pseudo-trades
    // accumulate too.
    let trades = cells.trade_cell(SignalId::TrueOfi, 0);
    assert!(trades.count() > 0);

    // Metrics stay finite on a live cell.
    assert!(ic.pearson_ic().is_finite());
    assert!(ic.rank_ic().is_finite());
    let (mi, nmi) = ic.mutual_information(0, 0);
    assert!(mi.is_finite() && nmi.is_finite());
}

#[test]
fn tapes_round_trip_through_disk_before_study() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mes-synthetic.quantdev");

    let source = synthetic_tape(1_500);
    let mut enc = TapeEncoder::with_chunk_capacity(&path, 512).unwrap();
    for i in 0..source.count {
        enc.add_row(&TapeRow {
            ts_event: source.ts_event[i],
            ts_recv: source.ts_recv[i],
            ts_in_delta: source.ts_in_delta[i],
            price: source.prices[i],
            size: source.sizes[i],
            side: source.sides[i],
            action: source.actions[i],
            flags: source.flags[i],
            depth: source.depth[i],
            sequence: source.sequences[i],
            bid_px: source.bid_px[i],
            ask_px: source.ask_px[i],
            bid_sz: source.bid_sz[i],
            ask_sz: source.ask_sz[i],
            bid_ct: source.bid_ct[i],
            ask_ct: source.ask_ct[i],
            publisher_id: source.publisher_id[i],
            instrument_id: source.instrument_id[i],
        })
        .unwrap();
    }
    enc.close().unwrap();

    let mut decoded = TbboColumns::new();
    decode_into(&path, &mut decoded).unwrap();

    // The decoded tape produces the same study as the in-memory source.
    let config = StudyConfig::default();
    let mut from_source = StudyAggregator::new();
    let mut from_disk = StudyAggregator::new();
    run_atom_study(&source, &config, &mut from_source);
    run_atom_study(&decoded, &config, &mut from_disk);

    for atom in [AtomId::Ofi, AtomId::SweepKappa, AtomId::MicroDev] {
        let a = from_source.cell(atom, 1, Bucket::InSample).calculate();
        let b = from_disk.cell(atom, 1, Bucket::InSample).calculate();
        assert_eq!(a.n, b.n);
        assert_eq!(a.ic.to_bits(), b.ic.to_bits());
    }

    assert_eq!(symbol_from_path(&path), "MES");
}

#[test]
fn gapped_tape_still_studies_cleanly() {
    let mut cols = synthetic_tape(2_000);
    // Tear a hole in the sequence stream mid-tape.
    for i in 1_000..cols.count {
        cols.sequences[i] += 50;
    }

    let config = StudyConfig::default();
    let mut agg = StudyAggregator::new();
    run_atom_study(&cols, &config, &mut agg);

    // The study survives and still accumulates on both sides of the gap.
    let n = agg.cell(AtomId::Ofi, 0, Bucket::InSample).count();
    assert!(n > 1_000);
}
