//! Strategy-level risk metrics for one signal × horizon cell.
//!
//! Each observation is one "pseudo-trade": direction = sign(signal),
//! return = sign(signal) × future log-return, zero fees. This is the
//! deliberate pure-alpha mode: the running peak and max drawdown track
//! the signed strategy stream itself, not a costed equity curve.
//!
//! Running moments include every observation; the bounded returns list
//! (first [`MAX_RETURNS`] samples) only feeds the tail and win/loss
//! metrics.

use std::cmp::Ordering;

use super::MAX_RETURNS;

/// Accumulated per-trade outcomes for one signal × horizon.
#[derive(Debug, Clone, Default)]
pub struct AdvancedStats {
    count: u64,
    wins: u64,
    total_pnl: f64,
    peak_pnl: f64,
    max_dd: f64,

    // Raw moment sums over all observations.
    sum_pnl: f64,
    sum_pnl2: f64,
    sum_pnl3: f64,
    sum_pnl4: f64,

    /// Bounded head of the return stream; tails and W/L only.
    returns: Vec<f64>,
}

impl AdvancedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one net strategy return. Non-finite values are dropped.
    pub fn update(&mut self, net: f64) {
        if !net.is_finite() {
            return;
        }
        self.count += 1;
        self.total_pnl += net;
        if net > 0.0 {
            self.wins += 1;
        }

        if self.total_pnl > self.peak_pnl {
            self.peak_pnl = self.total_pnl;
        }
        let dd = self.peak_pnl - self.total_pnl;
        if dd > self.max_dd {
            self.max_dd = dd;
        }

        self.sum_pnl += net;
        self.sum_pnl2 += net * net;
        self.sum_pnl3 += net * net * net;
        self.sum_pnl4 += net * net * net * net;

        if self.returns.len() < MAX_RETURNS {
            self.returns.push(net);
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    /// Largest peak-to-trough fall of the cumulative stream so far.
    #[inline]
    pub fn max_drawdown(&self) -> f64 {
        self.max_dd
    }

    /// Winning fraction, in percent.
    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.wins as f64 / self.count as f64 * 100.0
    }

    /// Per-observation Sharpe from the running moments.
    pub fn sharpe(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum_pnl / n;
        let variance = self.sum_pnl2 / n - mean * mean;
        if variance <= 1e-12 {
            return 0.0;
        }
        mean / variance.sqrt()
    }

    /// Third standardized moment of the return stream.
    pub fn skewness(&self) -> f64 {
        if self.count < 3 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum_pnl / n;
        let variance = self.sum_pnl2 / n - mean * mean;
        if variance < 1e-12 {
            return 0.0;
        }
        let std_dev = variance.sqrt();
        let m3 = self.sum_pnl3 / n - 3.0 * mean * (self.sum_pnl2 / n) + 2.0 * mean * mean * mean;
        m3 / (std_dev * std_dev * std_dev)
    }

    /// |mean win / mean loss| over the retained returns; 0 when either
    /// side is empty.
    pub fn win_loss_ratio(&self) -> f64 {
        let mut sum_win = 0.0;
        let mut sum_loss = 0.0;
        let mut n_win = 0usize;
        let mut n_loss = 0usize;
        for &r in &self.returns {
            if r > 0.0 {
                sum_win += r;
                n_win += 1;
            } else if r < 0.0 {
                sum_loss += r;
                n_loss += 1;
            }
        }
        if n_win == 0 || n_loss == 0 {
            return 0.0;
        }
        let avg_win = sum_win / n_win as f64;
        let avg_loss = sum_loss / n_loss as f64;
        if avg_loss == 0.0 {
            return 0.0;
        }
        (avg_win / avg_loss).abs()
    }

    /// p-th percentile of the retained returns, `p` clamped to [0, 1].
    pub fn tail_percentile(&self, p: f64) -> f64 {
        let n = self.returns.len();
        if n == 0 {
            return 0.0;
        }
        let p = p.clamp(0.0, 1.0);
        let mut sorted = self.returns.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        sorted[(p * (n - 1) as f64) as usize]
    }

    /// Fieldwise merge of a disjoint accumulator.
    ///
    /// Moment sums add exactly; peak and max drawdown take the max of the
    /// two sides, which under-counts a drawdown spanning the seam. That
    /// approximation is accepted; streams merge in arbitrary order.
    pub fn merge_from(&mut self, other: &AdvancedStats) {
        self.count += other.count;
        self.wins += other.wins;
        self.total_pnl += other.total_pnl;
        self.sum_pnl += other.sum_pnl;
        self.sum_pnl2 += other.sum_pnl2;
        self.sum_pnl3 += other.sum_pnl3;
        self.sum_pnl4 += other.sum_pnl4;

        let space = MAX_RETURNS.saturating_sub(self.returns.len());
        let take = space.min(other.returns.len());
        self.returns.extend_from_slice(&other.returns[..take]);

        if other.max_dd > self.max_dd {
            self.max_dd = other.max_dd;
        }
        if other.peak_pnl > self.peak_pnl {
            self.peak_pnl = other.peak_pnl;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_rate_counts_strictly_positive() {
        let mut s = AdvancedStats::new();
        s.update(1.0);
        s.update(-1.0);
        s.update(0.0);
        s.update(2.0);
        assert!((s.win_rate() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn drawdown_tracks_peak_to_trough() {
        let mut s = AdvancedStats::new();
        for &r in &[1.0, 1.0, -0.5, -1.0, 0.2] {
            s.update(r);
        }
        // Peak 2.0, trough 0.5 → drawdown 1.5.
        assert!((s.max_drawdown() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn drawdown_is_monotone_through_any_stream() {
        let mut s = AdvancedStats::new();
        let mut prev_dd = 0.0;
        for i in 0..500 {
            let r = ((i * 37) % 13) as f64 - 6.0;
            s.update(r);
            assert!(s.max_drawdown() >= prev_dd);
            prev_dd = s.max_drawdown();
        }
    }

    #[test]
    fn sharpe_of_constant_stream_is_zero() {
        let mut s = AdvancedStats::new();
        for _ in 0..10 {
            s.update(0.5);
        }
        assert_eq!(s.sharpe(), 0.0); // zero variance
    }

    #[test]
    fn skewness_sign_follows_asymmetry() {
        let mut s = AdvancedStats::new();
        for _ in 0..95 {
            s.update(-0.1);
        }
        for _ in 0..5 {
            s.update(5.0); // rare large wins: right skew
        }
        assert!(s.skewness() > 0.0);
    }

    #[test]
    fn tail_percentile_clamps_p() {
        let mut s = AdvancedStats::new();
        for i in 0..10 {
            s.update(i as f64);
        }
        assert_eq!(s.tail_percentile(-1.0), 0.0);
        assert_eq!(s.tail_percentile(2.0), 9.0);
        assert_eq!(s.tail_percentile(0.5), 4.0); // idx = floor(0.5 * 9)
    }

    #[test]
    fn win_loss_ratio_needs_both_sides() {
        let mut wins_only = AdvancedStats::new();
        wins_only.update(1.0);
        assert_eq!(wins_only.win_loss_ratio(), 0.0);

        let mut both = AdvancedStats::new();
        both.update(2.0);
        both.update(-1.0);
        assert!((both.win_loss_ratio() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn returns_list_is_bounded_but_moments_see_everything() {
        let mut s = AdvancedStats::new();
        for _ in 0..(MAX_RETURNS + 1000) {
            s.update(0.001);
        }
        assert_eq!(s.count(), (MAX_RETURNS + 1000) as u64);
        assert!((s.total_pnl() - 0.001 * (MAX_RETURNS + 1000) as f64).abs() < 1e-6);
        assert_eq!(s.returns.len(), MAX_RETURNS);
    }

    #[test]
    fn merge_adds_sums_and_maxes_drawdown() {
        let mut a = AdvancedStats::new();
        a.update(1.0);
        a.update(-2.0); // dd 2.0 (peak 1.0, trough -1.0)

        let mut b = AdvancedStats::new();
        b.update(0.5);
        b.update(-0.25);

        a.merge_from(&b);
        assert_eq!(a.count(), 4);
        assert!((a.total_pnl() - (-0.75)).abs() < 1e-12);
        assert!((a.max_drawdown() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_updates_are_dropped() {
        let mut s = AdvancedStats::new();
        s.update(f64::NAN);
        s.update(f64::NEG_INFINITY);
        assert_eq!(s.count(), 0);
    }
}
