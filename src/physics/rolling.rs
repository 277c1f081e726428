//! Fixed-capacity rolling mean.
//!
//! A plain ring buffer: `update(x)` inserts a value, evicting the oldest
//! once the window is full, and returns the running mean. During warm-up
//! the mean divides by the number of values seen, not the capacity.

/// Ring buffer producing a running mean over the last `k` values.
#[derive(Debug, Clone)]
pub struct RollingMean {
    buf: Vec<f64>,
    head: usize,
    len: usize,
    sum: f64,
}

impl RollingMean {
    /// Create a window of capacity `k` (clamped to ≥ 1).
    pub fn new(k: usize) -> Self {
        let k = k.max(1);
        Self {
            buf: vec![0.0; k],
            head: 0,
            len: 0,
            sum: 0.0,
        }
    }

    /// Insert `x`, evicting the oldest value once full, and return the mean.
    #[inline]
    pub fn update(&mut self, x: f64) -> f64 {
        if self.len == self.buf.len() {
            self.sum -= self.buf[self.head];
        } else {
            self.len += 1;
        }
        self.buf[self.head] = x;
        self.sum += x;
        self.head = (self.head + 1) % self.buf.len();
        self.sum / self.len as f64
    }

    /// Current mean, 0 when empty.
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.sum / self.len as f64
        }
    }

    /// Number of values currently held.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no values are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Window capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Restore the empty state; capacity is kept.
    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sum = 0.0;
        // Stale slots are overwritten before they re-enter the sum.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_divides_by_count() {
        let mut w = RollingMean::new(4);
        assert_eq!(w.update(2.0), 2.0);
        assert_eq!(w.update(4.0), 3.0);
        assert_eq!(w.update(6.0), 4.0);
    }

    #[test]
    fn matches_exact_window_mean() {
        let xs: Vec<f64> = (1..=20).map(|i| i as f64 * 0.7).collect();
        let k = 5;
        let mut w = RollingMean::new(k);
        for (i, &x) in xs.iter().enumerate() {
            let got = w.update(x);
            let lo = (i + 1).saturating_sub(k);
            let window = &xs[lo..=i];
            let want = window.iter().sum::<f64>() / window.len() as f64;
            assert!((got - want).abs() < 1e-12, "step {i}: {got} vs {want}");
        }
    }

    #[test]
    fn evicts_exactly_one_per_insert() {
        let mut w = RollingMean::new(2);
        w.update(10.0);
        w.update(20.0);
        assert_eq!(w.update(30.0), 25.0); // 10 evicted
        assert_eq!(w.update(40.0), 35.0); // 20 evicted
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn reset_restores_empty_state() {
        let mut w = RollingMean::new(3);
        w.update(1.0);
        w.update(2.0);
        w.reset();
        assert!(w.is_empty());
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.update(8.0), 8.0);
    }

    #[test]
    fn capacity_clamped_to_one() {
        let mut w = RollingMean::new(0);
        assert_eq!(w.capacity(), 1);
        assert_eq!(w.update(3.0), 3.0);
        assert_eq!(w.update(5.0), 5.0);
    }
}
