//! Sufficient-statistics signal/return correlation.
//!
//! Keeps only the six sums needed for a Pearson information coefficient,
//! so accumulators from disjoint streams merge by fieldwise addition and
//! the merged IC equals the IC of the pooled stream. Used by the
//! atom-level study where thousands of (atom × horizon × bucket) cells
//! must stay cheap.

/// Mergeable running sums for one signal/return pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct RobustStats {
    n: u64,
    sum_s: f64,
    sum_r: f64,
    sum_s2: f64,
    sum_r2: f64,
    sum_sr: f64,
}

/// Point-in-time metrics derived from [`RobustStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RobustSummary {
    pub n: u64,
    /// Pearson correlation between signal and future return.
    pub ic: f64,
    /// t-statistic of the IC, saturated at ±999 near |ic| = 1.
    pub t_stat: f64,
    /// Annualized Sharpe proxy, ic·√(252·1440).
    pub sharpe: f64,
}

/// Below this sample count every output is reported as 0.
const MIN_SAMPLES: u64 = 30;

/// Variance floor; flat inputs produce no correlation.
const VAR_FLOOR: f64 = 1e-12;

impl RobustStats {
    /// Record one observation; non-finite coordinates are dropped.
    #[inline]
    pub fn update(&mut self, sig: f64, ret: f64) {
        if !sig.is_finite() || !ret.is_finite() {
            return;
        }
        self.n += 1;
        self.sum_s += sig;
        self.sum_r += ret;
        self.sum_s2 += sig * sig;
        self.sum_r2 += ret * ret;
        self.sum_sr += sig * ret;
    }

    /// Fieldwise merge of a disjoint accumulator.
    pub fn merge(&mut self, other: &RobustStats) {
        self.n += other.n;
        self.sum_s += other.sum_s;
        self.sum_r += other.sum_r;
        self.sum_s2 += other.sum_s2;
        self.sum_r2 += other.sum_r2;
        self.sum_sr += other.sum_sr;
    }

    /// Observations recorded so far.
    #[inline]
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Derive IC, t-stat, and the Sharpe proxy.
    pub fn calculate(&self) -> RobustSummary {
        if self.n < MIN_SAMPLES {
            return RobustSummary {
                n: self.n,
                ..RobustSummary::default()
            };
        }
        let nf = self.n as f64;
        let mean_s = self.sum_s / nf;
        let mean_r = self.sum_r / nf;
        let var_s = self.sum_s2 / nf - mean_s * mean_s;
        let var_r = self.sum_r2 / nf - mean_r * mean_r;
        if var_s <= VAR_FLOOR || var_r <= VAR_FLOOR {
            return RobustSummary {
                n: self.n,
                ..RobustSummary::default()
            };
        }
        let cov = self.sum_sr / nf - mean_s * mean_r;
        let ic = cov / (var_s * var_r).sqrt();

        let t_stat = if ic.abs() > 0.999999 {
            999.0_f64.copysign(ic)
        } else {
            ic * ((self.n - 2) as f64).sqrt() / (1.0 - ic * ic).sqrt()
        };

        // Scale per-minute information to a yearly figure: 252 sessions
        // of 1440 minutes.
        let sharpe = ic * (252.0 * 1440.0_f64).sqrt();

        RobustSummary {
            n: self.n,
            ic,
            t_stat,
            sharpe,
        }
    }
}
