//! Forward horizon cursors and future-return targets.
//!
//! For each event `i` and horizon `h` the target is the first index whose
//! event time is at least `ts_event[i] + h`. Because event time is
//! nondecreasing, the target index for `i+1` can only be at or after the
//! target for `i`, so one cursor per horizon advanced by linear forward
//! search costs amortized O(1) per event.
//!
//! When no index reaches the target time the cursor clamps to the last
//! row and the return is reported as NaN; statistics drop NaN at the
//! observation site, so tail events near the end of a tape simply fall
//! out of the sample.

use crate::physics::EPSILON;
use crate::tape::TbboColumns;

/// Number of prediction horizons.
pub const HZ_COUNT: usize = 3;

/// Horizon offsets in nanoseconds: 10s / 20s / 30s.
pub const HORIZON_DURATIONS_NS: [u64; HZ_COUNT] = [10_000_000_000, 20_000_000_000, 30_000_000_000];

/// Display names aligned with [`HORIZON_DURATIONS_NS`].
pub const HORIZON_NAMES: [&str; HZ_COUNT] = ["10s", "20s", "30s"];

/// Robust mid at row `idx`: book mid, falling back to the trade price
/// when the book side prices are missing or degenerate.
#[inline]
pub fn mid_at(cols: &TbboColumns, idx: usize) -> f64 {
    let mid = (cols.bid_px[idx] + cols.ask_px[idx]) * 0.5;
    if mid < EPSILON {
        cols.prices[idx]
    } else {
        mid
    }
}

/// Monotone per-horizon cursors over one tape pass.
#[derive(Debug, Default)]
pub struct HorizonCursors {
    cursors: [usize; HZ_COUNT],
}

impl HorizonCursors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance all cursors for event `i` and return, per horizon, the
    /// clamped target index and whether the target time was actually
    /// reached.
    pub fn advance(&mut self, i: usize, ts: &[u64]) -> [(usize, bool); HZ_COUNT] {
        let n = ts.len();
        let now = ts[i];
        let mut out = [(0usize, false); HZ_COUNT];

        for (h, &dur) in HORIZON_DURATIONS_NS.iter().enumerate() {
            let target = now + dur;
            let mut c = self.cursors[h].max(i);
            while c < n && ts[c] < target {
                c += 1;
            }
            if c >= n {
                // Past the end of the tape: clamp, mark undefined.
                self.cursors[h] = n - 1;
                out[h] = (n - 1, false);
            } else {
                self.cursors[h] = c;
                out[h] = (c, true);
            }
        }
        out
    }

    /// Log future returns for event `i` against `cur_mid`, NaN where the
    /// horizon runs off the tape or either mid is degenerate.
    pub fn returns(&mut self, i: usize, cols: &TbboColumns, cur_mid: f64) -> [f64; HZ_COUNT] {
        let targets = self.advance(i, &cols.ts_event[..cols.count]);
        let mut rets = [f64::NAN; HZ_COUNT];
        for (h, &(idx, defined)) in targets.iter().enumerate() {
            if !defined {
                continue;
            }
            let fut_mid = mid_at(cols, idx);
            if cur_mid > EPSILON && fut_mid > EPSILON {
                rets[h] = (fut_mid / cur_mid).ln();
            }
        }
        rets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols_with_ts(ts: &[u64]) -> TbboColumns {
        let mut cols = TbboColumns::new();
        let n = ts.len();
        cols.resize_for(n);
        cols.count = n;
        for (i, &t) in ts.iter().enumerate() {
            cols.ts_event[i] = t;
            cols.bid_px[i] = 100.0;
            cols.ask_px[i] = 100.02;
            cols.prices[i] = 100.01;
        }
        cols
    }

    const SEC: u64 = 1_000_000_000;

    #[test]
    fn cursor_boundaries() {
        // S5 timeline: events at 0, 5s, 10s, 15s, 25s with a 10s horizon.
        let ts = [0, 5 * SEC, 10 * SEC, 15 * SEC, 25 * SEC];
        let cols = cols_with_ts(&ts);
        let mut cur = HorizonCursors::new();

        let mut idx10 = Vec::new();
        let mut def10 = Vec::new();
        for i in 0..ts.len() {
            let t = cur.advance(i, &cols.ts_event);
            idx10.push(t[0].0);
            def10.push(t[0].1);
        }
        // First index with ts ≥ ts[i] + 10s, clamped at the tail.
        assert_eq!(idx10, vec![2, 3, 4, 4, 4]);
        assert_eq!(def10, vec![true, true, true, true, false]);
    }

    #[test]
    fn cursors_never_move_backwards() {
        let ts: Vec<u64> = (0..200).map(|i| i * 700_000_000).collect();
        let cols = cols_with_ts(&ts);
        let mut cur = HorizonCursors::new();
        let mut prev = [0usize; HZ_COUNT];
        for i in 0..ts.len() {
            let t = cur.advance(i, &cols.ts_event);
            for h in 0..HZ_COUNT {
                assert!(t[h].0 >= prev[h]);
                assert!(t[h].0 >= i || !t[h].1);
                prev[h] = t[h].0;
            }
        }
    }

    #[test]
    fn longer_horizons_never_land_earlier() {
        let ts: Vec<u64> = (0..500).map(|i| i * i * 13_000_000).collect();
        let cols = cols_with_ts(&ts);
        let mut cur = HorizonCursors::new();
        for i in 0..ts.len() {
            let t = cur.advance(i, &cols.ts_event);
            assert!(t[0].0 <= t[1].0);
            assert!(t[1].0 <= t[2].0);
        }
    }

    #[test]
    fn undefined_returns_are_nan() {
        let ts = [0, SEC, 2 * SEC];
        let cols = cols_with_ts(&ts);
        let mut cur = HorizonCursors::new();
        let rets = cur.returns(2, &cols, mid_at(&cols, 2));
        assert!(rets.iter().all(|r| r.is_nan()));
    }

    #[test]
    fn flat_future_mid_gives_zero_return() {
        let ts = [0, SEC, 11 * SEC];
        let cols = cols_with_ts(&ts);
        let mut cur = HorizonCursors::new();
        let rets = cur.returns(0, &cols, mid_at(&cols, 0));
        assert!((rets[0] - 0.0).abs() < 1e-12);
        assert!(rets[2].is_nan()); // 30s runs off the tape
    }
}
