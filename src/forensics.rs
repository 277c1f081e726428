//! Data forensics: gap and bad-price scan over decoded tapes.
//!
//! A sequential pass per tape that measures timestamp continuity and
//! price sanity. Records whose capture timestamp is flagged unreliable
//! are ignored entirely. Deltas beyond the closure cut are treated as
//! market closures, not data loss, and excluded from the gap counts.

use std::path::Path;

use crate::config::flags;
use crate::study::tape_files;
use crate::tape::{load_tape, ColumnPool, TbboColumns, TAPE_EXT};

/// Gap counted when two ticks are further apart than this.
pub const GAP_THRESHOLD_NS: u64 = 1_000_000_000; // 1s

/// A gap this large inside a session points at real packet loss.
pub const BIG_GAP_NS: u64 = 60_000_000_000; // 60s

/// Anything above this is an overnight/weekend closure, not a gap.
pub const CLOSURE_CUT_NS: u64 = 12 * 3600 * 1_000_000_000; // 12h

/// WARN once more than this fraction of ticks shows a big gap.
pub const WARN_BIG_GAP_FRAC: f64 = 0.01;

/// Prices at or below this are counted as bad prints.
pub const BAD_PRICE_EPS: f64 = 1e-4;

/// Health verdict for one tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapeStatus {
    Ok,
    Warn,
    Empty,
}

impl std::fmt::Display for TapeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapeStatus::Ok => write!(f, "OK"),
            TapeStatus::Warn => write!(f, "WARN"),
            TapeStatus::Empty => write!(f, "EMPTY"),
        }
    }
}

/// Scan result for one tape file.
#[derive(Debug, Clone)]
pub struct ForensicsReport {
    pub file: String,
    pub ticks: usize,
    pub gaps_1s: usize,
    pub gaps_60s: usize,
    pub max_gap_ns: u64,
    pub bad_prices: usize,
    pub status: TapeStatus,
}

impl ForensicsReport {
    /// Percentage of ticks with a gap above 1s.
    pub fn frac_1s(&self) -> f64 {
        percentage(self.gaps_1s, self.ticks)
    }

    /// Percentage of ticks with a gap above 60s.
    pub fn frac_60s(&self) -> f64 {
        percentage(self.gaps_60s, self.ticks)
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Scan one decoded tape.
pub fn scan_tape(file: &str, cols: &TbboColumns) -> ForensicsReport {
    let n = cols.count;
    if n == 0 {
        return ForensicsReport {
            file: file.to_string(),
            ticks: 0,
            gaps_1s: 0,
            gaps_60s: 0,
            max_gap_ns: 0,
            bad_prices: 0,
            status: TapeStatus::Empty,
        };
    }

    let mut gaps_1s = 0usize;
    let mut gaps_60s = 0usize;
    let mut bad_prices = 0usize;
    let mut max_gap_ns = 0u64;

    let times = &cols.ts_event[..n];
    let prices = &cols.prices[..n];
    let fl = &cols.flags[..n];

    for i in 1..n {
        if fl[i] & flags::BAD_TS_RECV != 0 {
            continue;
        }

        let dt = times[i].saturating_sub(times[i - 1]);
        if dt > max_gap_ns {
            max_gap_ns = dt;
        }
        if dt > CLOSURE_CUT_NS {
            continue;
        }

        if dt > GAP_THRESHOLD_NS {
            gaps_1s += 1;
        }
        if dt > BIG_GAP_NS {
            gaps_60s += 1;
        }

        if prices[i] <= BAD_PRICE_EPS {
            bad_prices += 1;
        }
    }

    let status = if bad_prices > 0 || percentage(gaps_60s, n) > WARN_BIG_GAP_FRAC * 100.0 {
        TapeStatus::Warn
    } else {
        TapeStatus::Ok
    };

    ForensicsReport {
        file: file.to_string(),
        ticks: n,
        gaps_1s,
        gaps_60s,
        max_gap_ns,
        bad_prices,
        status,
    }
}

/// The `check` verb: scan every tape in `dir` sequentially.
///
/// Undecodable tapes are logged and omitted from the results.
pub fn run_check(dir: &Path) -> std::io::Result<Vec<ForensicsReport>> {
    let files = tape_files(dir, TAPE_EXT)?;
    let pool = ColumnPool::new();
    let mut reports = Vec::with_capacity(files.len());

    for path in &files {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
            .to_string();
        match load_tape(path, &pool) {
            Ok(cols) => {
                reports.push(scan_tape(&name, &cols));
                pool.put(cols);
            }
            Err(e) => {
                log::error!("{name}: {e}");
            }
        }
    }
    Ok(reports)
}
