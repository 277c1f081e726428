//! Study driver: fan-out over tape files, merge into global reports.
//!
//! The `test` verb runs two passes over every `*.quantdev` file in the
//! working directory:
//!
//! 1. **Atom study**: every atom's raw value observed against the three
//!    horizon returns, split into in-sample / out-of-sample buckets, into
//!    mergeable [`StudyAggregator`] cells. Runs on the CPU-wide pool.
//! 2. **Signal backtest**: the physics + signal engine loop, observing
//!    each signal against each horizon return and the signed directional
//!    strategy return. Memory-heavy (bounded sample lists per cell), so
//!    it runs on a small dedicated pool.
//!
//! Each worker owns its column container (from the shared pool), physics
//! state, cursors, and local accumulators; the only shared writes are the
//! per-tape merges at the end. Decode failures are logged and the tape is
//! skipped; a bad file never aborts the run.
//!
//! Files are visited largest first so the long poles start early.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::config::{asset_config_for, StudyConfig};
use crate::horizon::HorizonCursors;
use crate::physics::{AtomId, Atoms, MarketPhysics};
use crate::signals::{SignalEngine, SignalId, SIGNAL_COUNT};
use crate::stats::{Bucket, Portfolio, ReportCells, StudyAggregator};
use crate::tape::{load_tape, ColumnPool, TbboColumns, TAPE_EXT};

/// Outcome counters for one driver invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StudySummary {
    pub files: usize,
    pub skipped: usize,
    pub rows: u64,
}

/// Run the atom-level multi-horizon study over one decoded tape.
///
/// Observations land in `agg`, bucketed by the in-sample / out-of-sample
/// row split. Tapes below the configured minimum are ignored.
pub fn run_atom_study(cols: &TbboColumns, config: &StudyConfig, agg: &mut StudyAggregator) {
    let n = cols.count;
    if n < config.min_rows_study {
        return;
    }

    let split_idx = (n as f64 * (1.0 - config.oos_ratio)) as usize;

    let mut mp = MarketPhysics::new(config.liq_flag_mask);
    mp.prime(cols);
    let mut cursors = HorizonCursors::new();
    let mut atoms = Atoms::default();

    for i in 1..n {
        let bucket = if i >= split_idx {
            Bucket::OutOfSample
        } else {
            Bucket::InSample
        };

        mp.update_atoms(i, cols, &mut atoms);
        let rets = cursors.returns(i, cols, atoms.mid);

        for atom in AtomId::ALL {
            let value = atoms.get(atom);
            for (h, &ret) in rets.iter().enumerate() {
                agg.update(atom, h, bucket, value, ret);
            }
        }
    }
}

/// Run the signal backtest over one decoded tape into thread-local cells.
///
/// Each (signal, horizon) observation is one pseudo-trade: direction is
/// the sign of the signal, return is the signed future log-return, fees
/// are zero. `liq_threshold` comes from the asset config of the tape's
/// symbol.
pub fn run_signal_backtest(
    cols: &TbboColumns,
    config: &StudyConfig,
    liq_threshold: f64,
    cells: &mut ReportCells,
) {
    let n = cols.count;
    if n < config.min_rows_backtest {
        return;
    }
    debug_assert!(cols.check_lengths());

    let mut mp = MarketPhysics::new(config.liq_flag_mask);
    mp.prime(cols);
    let mut cursors = HorizonCursors::new();
    let mut atoms = Atoms::default();
    let engine = SignalEngine::new(liq_threshold);
    let mut alphas = [0.0f64; SIGNAL_COUNT];

    for i in 1..n {
        mp.update_atoms(i, cols, &mut atoms);
        engine.compute(&atoms, &mut alphas);
        let rets = cursors.returns(i, cols, atoms.mid);

        for sig_id in SignalId::ALL {
            let sig = alphas[sig_id.index()];
            for (h, &ret) in rets.iter().enumerate() {
                cells.observe(sig_id, h, sig, ret);

                if sig == 0.0 || !sig.is_finite() {
                    continue;
                }
                let dir = if sig < 0.0 { -1.0 } else { 1.0 };
                // NaN returns are dropped inside the accumulator.
                cells.record_trade(sig_id, h, dir * ret);
            }
        }
    }
}

/// Derive the asset symbol from a tape filename: the stem up to the
/// first separator, uppercased (`mes-20240105.quantdev` → `MES`).
pub fn symbol_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN");
    stem.split(['-', '_', '.'])
        .next()
        .unwrap_or(stem)
        .to_ascii_uppercase()
}

/// Collect `*.{ext}` files in `dir`, largest first for load balance.
pub fn tape_files(dir: &Path, ext: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<(PathBuf, u64)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((path, size));
        }
    }
    files.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(files.into_iter().map(|(p, _)| p).collect())
}

/// The `test` verb: both study passes over every tape in `dir`.
///
/// Returns the master atom aggregator and the global portfolio for the
/// report printer.
pub fn run_test(
    dir: &Path,
    config: &StudyConfig,
) -> Result<(StudyAggregator, Portfolio, StudySummary), Box<dyn std::error::Error>> {
    let files = tape_files(dir, TAPE_EXT)?;
    if files.is_empty() {
        log::warn!("no .{TAPE_EXT} files found in {}", dir.display());
        return Ok((StudyAggregator::new(), Portfolio::new(), StudySummary::default()));
    }

    let pool = ColumnPool::new();
    let master = Mutex::new(StudyAggregator::new());
    let portfolio = Portfolio::new();
    let summary = Mutex::new(StudySummary::default());

    // --- Pass 1: atom study on the CPU-wide pool ---
    let cpu_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_cpu_threads())
        .build()?;

    cpu_pool.install(|| {
        files.par_iter().for_each(|path| {
            let cols = match load_tape(path, &pool) {
                Ok(cols) => cols,
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    summary.lock().unwrap().skipped += 1;
                    return;
                }
            };

            let mut local = StudyAggregator::new();
            run_atom_study(&cols, config, &mut local);
            master.lock().unwrap().merge(&local);

            let mut s = summary.lock().unwrap();
            s.files += 1;
            s.rows += cols.count as u64;
            drop(s);

            pool.put(cols);
            log::debug!("atom study done: {}", path.display());
        });
    });

    // --- Pass 2: signal backtest on the small memory-heavy pool ---
    let backtest_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.backtest_threads)
        .build()?;

    backtest_pool.install(|| {
        files.par_iter().for_each(|path| {
            let cols = match load_tape(path, &pool) {
                Ok(cols) => cols,
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    return;
                }
            };

            let symbol = symbol_from_path(path);
            let asset = asset_config_for(&symbol);

            let mut local = ReportCells::new();
            run_signal_backtest(&cols, config, asset.liq_threshold, &mut local);
            portfolio.merge_local(&symbol, &local);

            pool.put(cols);
            log::debug!("backtest done: {} ({symbol})", path.display());
        });
    });

    let master = master.into_inner().unwrap();
    let summary = summary.into_inner().unwrap();
    log::info!(
        "study complete: {} tapes, {} rows, {} skipped",
        summary.files,
        summary.rows,
        summary.skipped
    );
    Ok((master, portfolio, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_extraction_handles_separators() {
        assert_eq!(symbol_from_path(Path::new("mes-20240105.quantdev")), "MES");
        assert_eq!(symbol_from_path(Path::new("MNQ_h1.quantdev")), "MNQ");
        assert_eq!(symbol_from_path(Path::new("mgc.quantdev")), "MGC");
    }

    #[test]
    fn short_tapes_are_skipped_by_both_passes() {
        let mut cols = TbboColumns::new();
        cols.resize_for(10);
        cols.count = 10;

        let config = StudyConfig::default();
        let mut agg = StudyAggregator::new();
        run_atom_study(&cols, &config, &mut agg);
        assert_eq!(agg.cell(AtomId::Mid, 0, Bucket::InSample).count(), 0);

        let mut cells = ReportCells::new();
        run_signal_backtest(&cols, &config, 50.0, &mut cells);
        assert_eq!(cells.ic_cell(SignalId::TrueOfi, 0).count(), 0);
    }
}
