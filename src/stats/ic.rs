//! Sample-retaining signal/return joint metrics.
//!
//! Everything distribution-shaped (rank correlation, conditional decile
//! returns, mutual information, cross-entropy improvement) needs the
//! samples themselves, so this accumulator keeps a bounded head of the
//! stream (first [`MAX_IC_SAMPLES`] observations) alongside nothing else.
//! Head-keep rather than reservoir sampling is deliberate: merge stays a
//! plain bounded append, at the cost of the tail of very long streams.
//!
//! All metrics here are descriptive; they never feed back into the event
//! loop.

use std::cmp::Ordering;

use super::MAX_IC_SAMPLES;

/// Bounded paired samples of (signal, future return).
#[derive(Debug, Clone, Default)]
pub struct ICStats {
    sig: Vec<f64>,
    ret: Vec<f64>,
}

impl ICStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Non-finite coordinates are dropped; once
    /// the cap is reached further observations are ignored.
    #[inline]
    pub fn observe(&mut self, sig: f64, ret: f64) {
        if !sig.is_finite() || !ret.is_finite() {
            return;
        }
        if self.sig.len() < MAX_IC_SAMPLES {
            self.sig.push(sig);
            self.ret.push(ret);
        }
    }

    /// Retained sample count.
    #[inline]
    pub fn count(&self) -> usize {
        self.sig.len()
    }

    /// Retained samples, for report-side consumers.
    pub fn samples(&self) -> (&[f64], &[f64]) {
        (&self.sig, &self.ret)
    }

    /// Append another accumulator's samples up to the remaining capacity.
    pub fn merge_from(&mut self, other: &ICStats) {
        let space = MAX_IC_SAMPLES.saturating_sub(self.sig.len());
        let take = space.min(other.sig.len());
        self.sig.extend_from_slice(&other.sig[..take]);
        self.ret.extend_from_slice(&other.ret[..take]);
    }

    /// Pearson correlation of the retained samples.
    pub fn pearson_ic(&self) -> f64 {
        pearson_from_samples(&self.sig, &self.ret)
    }

    /// Spearman rank correlation.
    ///
    /// Ranks are ordinal 1..n with ties broken by input order (no
    /// mid-rank adjustment); the stable sort makes the tie order
    /// deterministic.
    pub fn rank_ic(&self) -> f64 {
        let n = self.sig.len();
        if n < 2 {
            return 0.0;
        }
        let r_sig = ordinal_ranks(&self.sig);
        let r_ret = ordinal_ranks(&self.ret);
        pearson_from_samples(&r_sig, &r_ret)
    }

    /// Fraction of observations where sign(signal) matches sign(return),
    /// ignoring exact zeros on either side.
    pub fn hit_rate(&self) -> f64 {
        let mut total = 0usize;
        let mut correct = 0usize;
        for (&s, &r) in self.sig.iter().zip(&self.ret) {
            if s == 0.0 || r == 0.0 {
                continue;
            }
            if (s > 0.0) == (r > 0.0) {
                correct += 1;
            }
            total += 1;
        }
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Mean return per equal-count signal bin, sorted by signal.
    ///
    /// Returns `(avg_return, count)` per bin; `k = 0` defaults to deciles.
    pub fn decile_curve(&self, k: usize) -> (Vec<f64>, Vec<usize>) {
        let n = self.sig.len();
        if n == 0 {
            return (Vec::new(), Vec::new());
        }
        let k = if k == 0 { 10 } else { k };

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            self.sig[a]
                .partial_cmp(&self.sig[b])
                .unwrap_or(Ordering::Equal)
        });

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (pos, &idx) in order.iter().enumerate() {
            let d = (pos * k / n).min(k - 1);
            sums[d] += self.ret[idx];
            counts[d] += 1;
        }
        let avg = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect();
        (avg, counts)
    }

    /// Mutual information and NMI between binned signal and return.
    ///
    /// Equal-width histograms; `(sig_bins, ret_bins) = (0, 0)` defaults
    /// to 10 × 3. NMI normalizes by the return entropy H(Y). Constant
    /// inputs carry no information and report (0, 0).
    pub fn mutual_information(&self, sig_bins: usize, ret_bins: usize) -> (f64, f64) {
        let n = self.sig.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        let sig_bins = if sig_bins == 0 { 10 } else { sig_bins };
        let ret_bins = if ret_bins == 0 { 3 } else { ret_bins };

        let (min_s, max_s) = min_max(&self.sig);
        let (min_r, max_r) = min_max(&self.ret);
        if max_s == min_s || max_r == min_r {
            return (0.0, 0.0);
        }

        let mut joint = vec![0.0f64; sig_bins * ret_bins];
        let mut marg_s = vec![0.0f64; sig_bins];
        let mut marg_r = vec![0.0f64; ret_bins];

        for (&s, &r) in self.sig.iter().zip(&self.ret) {
            let sb = bin_index(s, min_s, max_s, sig_bins);
            let rb = bin_index(r, min_r, max_r, ret_bins);
            joint[sb * ret_bins + rb] += 1.0;
            marg_s[sb] += 1.0;
            marg_r[rb] += 1.0;
        }

        let nf = n as f64;
        for v in joint.iter_mut() {
            *v /= nf;
        }
        for v in marg_s.iter_mut() {
            *v /= nf;
        }
        for v in marg_r.iter_mut() {
            *v /= nf;
        }

        let h_y: f64 = marg_r
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum();
        if h_y <= 0.0 {
            return (0.0, 0.0);
        }

        let mut mi = 0.0;
        for sb in 0..sig_bins {
            for rb in 0..ret_bins {
                let pxy = joint[sb * ret_bins + rb];
                if pxy <= 0.0 {
                    continue;
                }
                let px = marg_s[sb];
                let py = marg_r[rb];
                if px <= 0.0 || py <= 0.0 {
                    continue;
                }
                mi += pxy * (pxy / (px * py)).ln();
            }
        }
        (mi, mi / h_y)
    }

    /// Cross-entropy improvement of a binned-signal model over the
    /// marginal baseline.
    ///
    /// Returns are labeled {down, flat, up} with a ±1e-9 flat band. The
    /// baseline predicts the empirical marginal; the model predicts a
    /// Laplace-smoothed conditional, (count+1)/(total+3), within 10
    /// equal-width signal bins. Returns `(baseline_loss, model_loss,
    /// baseline − model)`; degenerate inputs return zeros.
    pub fn delta_log_loss(&self) -> (f64, f64, f64) {
        let n = self.ret.len();
        if n == 0 {
            return (0.0, 0.0, 0.0);
        }

        const EPS: f64 = 1e-9;
        const K: usize = 10;

        let labels: Vec<usize> = self
            .ret
            .iter()
            .map(|&r| {
                if r > EPS {
                    2
                } else if r < -EPS {
                    0
                } else {
                    1
                }
            })
            .collect();

        let mut counts = [0usize; 3];
        for &c in &labels {
            counts[c] += 1;
        }

        let total = n as f64;
        let mut base_prob = [1e-12f64; 3];
        for c in 0..3 {
            if counts[c] > 0 {
                base_prob[c] = counts[c] as f64 / total;
            }
        }

        let base_loss: f64 =
            labels.iter().map(|&c| -base_prob[c].ln()).sum::<f64>() / total;

        let (min_s, max_s) = min_max(&self.sig);
        if max_s == min_s {
            return (base_loss, base_loss, 0.0);
        }

        let mut bin_counts = [[0usize; 3]; K];
        let mut bin_totals = [0usize; K];
        for (&s, &c) in self.sig.iter().zip(&labels) {
            let b = bin_index(s, min_s, max_s, K);
            bin_counts[b][c] += 1;
            bin_totals[b] += 1;
        }

        let mut probs = [[0.0f64; 3]; K];
        for b in 0..K {
            if bin_totals[b] == 0 {
                probs[b] = base_prob;
                continue;
            }
            let denom = bin_totals[b] as f64 + 3.0;
            for c in 0..3 {
                probs[b][c] = (bin_counts[b][c] as f64 + 1.0) / denom;
            }
        }

        let model_loss: f64 = self
            .sig
            .iter()
            .zip(&labels)
            .map(|(&s, &c)| -probs[bin_index(s, min_s, max_s, K)][c].ln())
            .sum::<f64>()
            / total;

        (base_loss, model_loss, base_loss - model_loss)
    }
}

/// Ordinal ranks 1..n; equal values keep their input order.
fn ordinal_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0.0; n];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

fn pearson_from_samples(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 || y.len() != n {
        return 0.0;
    }
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;
    let mut sum_xy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sum_x += xi;
        sum_y += yi;
        sum_x2 += xi * xi;
        sum_y2 += yi * yi;
        sum_xy += xi * yi;
    }
    let nf = n as f64;
    let cov = sum_xy / nf - (sum_x / nf) * (sum_y / nf);
    let var_x = sum_x2 / nf - (sum_x / nf) * (sum_x / nf);
    let var_y = sum_y2 / nf - (sum_y / nf) * (sum_y / nf);
    if var_x <= 1e-12 || var_y <= 1e-12 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

/// Equal-width bin index with saturating ends.
#[inline]
fn bin_index(v: f64, min_v: f64, max_v: f64, bins: usize) -> usize {
    if v <= min_v {
        return 0;
    }
    if v >= max_v {
        return bins - 1;
    }
    let r = (v - min_v) / (max_v - min_v);
    ((r * bins as f64) as usize).min(bins - 1)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let mut min_v = values[0];
    let mut max_v = values[0];
    for &v in &values[1..] {
        if v < min_v {
            min_v = v;
        }
        if v > max_v {
            max_v = v;
        }
    }
    (min_v, max_v)
}
