//! Per-symbol reports, the cross-tape portfolio, and the atom-level
//! study aggregator.
//!
//! # Locking discipline
//!
//! Two levels, never held together:
//!
//! 1. The portfolio map mutex guards symbol lookup/insert only.
//! 2. Each symbol report carries its own mutex guarding the metric cells.
//!
//! A worker resolves its `Arc<SymbolReport>` under the map lock, drops
//! it, then merges under the per-symbol lock. Workers accumulate into
//! plain thread-local [`ReportCells`] during the pass; locks are touched
//! once per tape.

use std::sync::{Arc, Mutex, MutexGuard};

use ahash::AHashMap;

use super::advanced::AdvancedStats;
use super::ic::ICStats;
use super::robust::RobustStats;
use crate::horizon::HZ_COUNT;
use crate::physics::{AtomId, ATOM_COUNT};
use crate::signals::{SignalId, SIGNAL_COUNT};

/// Metric cells for one symbol: one ICStats and one AdvancedStats per
/// signal × horizon.
#[derive(Debug, Default)]
pub struct ReportCells {
    signals: [[ICStats; HZ_COUNT]; SIGNAL_COUNT],
    trades: [[AdvancedStats; HZ_COUNT]; SIGNAL_COUNT],
}

impl ReportCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal/return observation.
    #[inline]
    pub fn observe(&mut self, sig_id: SignalId, h: usize, sig: f64, ret: f64) {
        self.signals[sig_id.index()][h].observe(sig, ret);
    }

    /// Record a directional strategy return.
    #[inline]
    pub fn record_trade(&mut self, sig_id: SignalId, h: usize, net: f64) {
        self.trades[sig_id.index()][h].update(net);
    }

    pub fn ic_cell(&self, sig_id: SignalId, h: usize) -> &ICStats {
        &self.signals[sig_id.index()][h]
    }

    pub fn trade_cell(&self, sig_id: SignalId, h: usize) -> &AdvancedStats {
        &self.trades[sig_id.index()][h]
    }

    /// Fieldwise merge of another report's cells.
    pub fn merge_from(&mut self, other: &ReportCells) {
        for s in 0..SIGNAL_COUNT {
            for h in 0..HZ_COUNT {
                self.signals[s][h].merge_from(&other.signals[s][h]);
                self.trades[s][h].merge_from(&other.trades[s][h]);
            }
        }
    }
}

/// One symbol's report, shared across workers behind its own lock.
#[derive(Debug)]
pub struct SymbolReport {
    symbol: String,
    cells: Mutex<ReportCells>,
}

impl SymbolReport {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            cells: Mutex::new(ReportCells::new()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Lock the metric cells for merging or reading.
    pub fn lock_cells(&self) -> MutexGuard<'_, ReportCells> {
        self.cells.lock().unwrap()
    }
}

/// Global symbol → report map.
#[derive(Debug, Default)]
pub struct Portfolio {
    assets: Mutex<AHashMap<String, Arc<SymbolReport>>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (or create) the shared report for `symbol`.
    ///
    /// Only the map lock is held here; callers take the per-symbol lock
    /// afterwards, never both at once.
    pub fn report_for(&self, symbol: &str) -> Arc<SymbolReport> {
        let mut assets = self.assets.lock().unwrap();
        assets
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(SymbolReport::new(symbol)))
            .clone()
    }

    /// Merge a worker's thread-local cells into the global report.
    pub fn merge_local(&self, symbol: &str, local: &ReportCells) {
        let report = self.report_for(symbol);
        // Map lock is released; only the symbol lock is held below.
        report.lock_cells().merge_from(local);
    }

    /// All reports, sorted by symbol for stable output.
    pub fn reports(&self) -> Vec<Arc<SymbolReport>> {
        let assets = self.assets.lock().unwrap();
        let mut out: Vec<_> = assets.values().cloned().collect();
        out.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        out
    }
}

// ============================================================================
// Atom-level study aggregation
// ============================================================================

/// In-sample / out-of-sample bucket of the row-count split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Bucket {
    InSample = 0,
    OutOfSample = 1,
}

/// Number of IS/OOS buckets.
pub const BUCKET_COUNT: usize = 2;

/// RobustStats cells for every atom × horizon × bucket.
///
/// Pure sufficient statistics, so thread-local aggregators merge into the
/// master by fieldwise addition.
#[derive(Debug, Clone, Default)]
pub struct StudyAggregator {
    stats: [[[RobustStats; BUCKET_COUNT]; HZ_COUNT]; ATOM_COUNT],
}

impl StudyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one atom observation against one horizon return.
    #[inline]
    pub fn update(&mut self, atom: AtomId, h: usize, bucket: Bucket, sig: f64, ret: f64) {
        self.stats[atom.index()][h][bucket as usize].update(sig, ret);
    }

    pub fn cell(&self, atom: AtomId, h: usize, bucket: Bucket) -> &RobustStats {
        &self.stats[atom.index()][h][bucket as usize]
    }

    /// Fieldwise merge of a thread-local aggregator.
    pub fn merge(&mut self, other: &StudyAggregator) {
        for a in 0..ATOM_COUNT {
            for h in 0..HZ_COUNT {
                for b in 0..BUCKET_COUNT {
                    self.stats[a][h][b].merge(&other.stats[a][h][b]);
                }
            }
        }
    }
}
