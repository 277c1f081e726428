//! Market-physics state machine.
//!
//! Converts a columnar TBBO stream into one [`Atoms`] vector per event.
//! The state carries the previous top-of-book snapshot, five rolling
//! windows for the derived aggregates, and a liquidation-run sub-state.
//!
//! # Sequence gaps
//!
//! The venue sequence counter is the ground truth for continuity. On a
//! non-contiguous sequence the whole rolling state is invalidated: windows
//! reset, the liquidation run cleared, and every derived aggregate reports
//! 0 for that event. Without this, a dropped packet burst shows up as a
//! phantom flow spike. The gap event still refreshes the previous-snapshot
//! fields and seeds the freshly reset windows, so processing resumes at
//! the next contiguous event with one warm sample already in place.
//!
//! # Event classes
//!
//! An event is a *trade* when its action code is `'T'`, its side is known,
//! and its size is positive. Trades drive OFI (flow vs. contra-queue
//! depletion), urgency, sweep, and the liquidation run; non-trade book
//! updates drive OFI in its book-delta form and decay the liquidation
//! strength.

use super::atoms::Atoms;
use super::rolling::RollingMean;
use super::EPSILON;
use crate::tape::TbboColumns;

/// Window capacities for the derived aggregates.
pub const OFI_WINDOW: usize = 64;
pub const DEPTH_WINDOW: usize = 128;
pub const URGENCY_WINDOW: usize = 32;
pub const SWEEP_WINDOW: usize = 64;

/// Action code for trade events in the tape's action column.
pub const ACTION_TRADE: i8 = b'T' as i8;

/// Liquidation-run sub-state: either no run, or an active one-sided run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiquidationRun {
    Idle,
    Running {
        /// Run direction, +1 or -1.
        side: i8,
        /// Price of the trade that opened the run.
        start_price: f64,
        /// Most advanced price in the run direction so far.
        extremum: f64,
        /// Total traded volume accumulated by the run.
        volume: f64,
        /// Sequence of the last trade folded into the run.
        last_sequence: u32,
    },
}

/// Per-tape streaming state producing the atom vector.
///
/// One instance per tape pass, thread-local to the worker. `prime` must
/// see event 0 before `update_atoms` is called for `i ≥ 1`.
#[derive(Debug)]
pub struct MarketPhysics {
    last_sequence: u32,
    valid_hist: bool,

    prev_ts: u64,
    prev_trade_px: f64,
    prev_mid: f64,
    prev_bid_sz: f64,
    prev_ask_sz: f64,

    ofi_win: RollingMean,
    bid_depth_win: RollingMean,
    ask_depth_win: RollingMean,
    urgency_win: RollingMean,
    sweep_win: RollingMean,

    liq: LiquidationRun,
    liq_strength: f64,
    /// Flag bit marking forced/liquidation prints; dataset-specific.
    liq_flag_mask: u8,
}

impl MarketPhysics {
    /// Create an unprimed state using `liq_flag_mask` to spot forced prints.
    pub fn new(liq_flag_mask: u8) -> Self {
        Self {
            last_sequence: 0,
            valid_hist: false,
            prev_ts: 0,
            prev_trade_px: 0.0,
            prev_mid: 0.0,
            prev_bid_sz: 0.0,
            prev_ask_sz: 0.0,
            ofi_win: RollingMean::new(OFI_WINDOW),
            bid_depth_win: RollingMean::new(DEPTH_WINDOW),
            ask_depth_win: RollingMean::new(DEPTH_WINDOW),
            urgency_win: RollingMean::new(URGENCY_WINDOW),
            sweep_win: RollingMean::new(SWEEP_WINDOW),
            liq: LiquidationRun::Idle,
            liq_strength: 0.0,
            liq_flag_mask,
        }
    }

    /// Seed the previous-snapshot fields from event 0.
    pub fn prime(&mut self, cols: &TbboColumns) {
        self.prev_ts = cols.ts_event[0];
        self.prev_trade_px = cols.prices[0];
        self.prev_mid = (cols.bid_px[0] + cols.ask_px[0]) * 0.5;
        if self.prev_mid < EPSILON {
            self.prev_mid = cols.prices[0];
        }
        self.prev_bid_sz = cols.bid_sz[0];
        self.prev_ask_sz = cols.ask_sz[0];
        self.last_sequence = cols.sequences[0];
        self.valid_hist = true;
    }

    /// Whether rolling history is currently trusted.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid_hist
    }

    /// Current liquidation sub-state.
    #[inline]
    pub fn liquidation(&self) -> LiquidationRun {
        self.liq
    }

    /// Compute the atom vector for event `i` (requires `i ≥ 1` and a
    /// primed state) and advance the internal state past it.
    pub fn update_atoms(&mut self, i: usize, cols: &TbboColumns, atoms: &mut Atoms) {
        let ts = cols.ts_event[i];
        let p = cols.prices[i];
        let q = cols.sizes[i];
        let side = cols.sides[i];
        let s = side as f64;
        let b = cols.bid_px[i];
        let a = cols.ask_px[i];
        let qb = cols.bid_sz[i];
        let qa = cols.ask_sz[i];
        let nb = cols.bid_ct[i];
        let na = cols.ask_ct[i];
        let seq = cols.sequences[i];
        let flags = cols.flags[i];

        let is_trade = cols.actions[i] == ACTION_TRADE && side != 0 && q > 0.0;

        // --- Sequence continuity ---
        let contiguous = seq == self.last_sequence.wrapping_add(1);
        if self.valid_hist && !contiguous {
            self.invalidate();
        } else if !self.valid_hist && contiguous {
            self.valid_hist = true;
        }

        // --- Stateless atoms ---
        let dt = ts.saturating_sub(self.prev_ts).max(1);
        let mut mid = (b + a) * 0.5;
        if mid < EPSILON {
            mid = p;
        }
        let spread = a - b;

        let micro = (b * qa + a * qb) / (qa + qb + EPSILON);

        let ln_qb = (1.0 + qb).ln();
        let ln_qa = (1.0 + qa).ln();
        let vol_imbalance = (ln_qb - ln_qa) / (ln_qb + ln_qa + EPSILON);

        let ln_nb = (1.0 + nb as f64).ln();
        let ln_na = (1.0 + na as f64).ln();
        let count_imbalance = (ln_nb - ln_na) / (ln_nb + ln_na + EPSILON);

        let log_vol = (1.0 + q).ln();
        let signed_vol = s * log_vol;
        let signed_velocity = signed_vol / (std::f64::consts::E + dt as f64).ln();

        let dp_trade = p - self.prev_trade_px;

        atoms.signed_vol = signed_vol;
        atoms.trade_sign = s;
        atoms.price_impact = (p - self.prev_mid) * s;
        atoms.signed_velocity = signed_velocity;
        atoms.whale_shock = if q > qa + qb { 1.0 } else { 0.0 };
        atoms.pressure_align = s * vol_imbalance;

        atoms.quoted_spread = spread;
        atoms.effective_spread = (p - mid) / spread.max(EPSILON);
        atoms.instant_amihud = dp_trade.abs() / (log_vol + 1.0);
        atoms.vol_imbalance = vol_imbalance;
        atoms.count_imbalance = count_imbalance;

        atoms.mid = mid;
        atoms.micro = micro;
        atoms.micro_dev = (micro - mid) * 1e4;
        atoms.cent_magnet = {
            let frac = p.fract().abs();
            1.0 - 2.0 * frac.min(1.0 - frac)
        };
        let avg_sz_bid = qb / nb.max(1) as f64;
        let avg_sz_ask = qa / na.max(1) as f64;
        atoms.avg_sz_bid = avg_sz_bid;
        atoms.avg_sz_ask = avg_sz_ask;

        atoms.inter_trade_dur = dt;
        atoms.capture_lat = cols.ts_recv[i] as i64 - ts as i64;
        atoms.send_delta = cols.ts_in_delta[i];

        // --- Rolling aggregates ---
        // Window inputs are pushed even while history is invalid: the gap
        // event itself seeds the freshly reset windows, and only the
        // reported outputs are forced to zero below.
        let d_qb = qb - self.prev_bid_sz;
        let d_qa = qa - self.prev_ask_sz;

        let ofi_raw = if is_trade {
            // Aggressive flow net of contra-queue depletion: a sweep met
            // by exact consumption nets to zero, replenishment leaves the
            // aggressor's imprint, cancellations flip the sign.
            if side > 0 {
                q + d_qa
            } else {
                -(q + d_qb)
            }
        } else {
            d_qb - d_qa
        };
        let ofi_mean = self.ofi_win.update(ofi_raw);

        let bid_depth_mean = self.bid_depth_win.update(avg_sz_bid);
        let ask_depth_mean = self.ask_depth_win.update(avg_sz_ask);

        let urgency_mean = if is_trade {
            let lag = (1.0 + cols.ts_in_delta[i].max(0) as f64).ln();
            self.urgency_win.update(s * q / lag.max(1.0))
        } else {
            self.urgency_win.mean()
        };

        let sweep_mean = if is_trade {
            let contra_prev = if side > 0 {
                self.prev_ask_sz
            } else {
                self.prev_bid_sz
            };
            let r = q / contra_prev.max(EPSILON);
            let kappa = if r >= 1.0 { s * r } else { 0.0 };
            self.sweep_win.update(kappa)
        } else {
            self.sweep_win.mean()
        };

        // --- Liquidation run ---
        if self.valid_hist {
            if is_trade {
                self.step_liquidation(side, p, q, seq, flags);
            } else {
                self.liq_strength *= 0.95;
            }
        }

        // --- Derived outputs ---
        if self.valid_hist {
            atoms.ofi = ofi_mean;
            atoms.crowding_skew = bid_depth_mean - ask_depth_mean;
            atoms.lat_urgency = urgency_mean;
            atoms.sweep_kappa = sweep_mean;
            atoms.liq_strength = self.liq_strength;
        } else {
            atoms.ofi = 0.0;
            atoms.crowding_skew = 0.0;
            atoms.lat_urgency = 0.0;
            atoms.sweep_kappa = 0.0;
            atoms.liq_strength = 0.0;
        }

        // --- Carry the snapshot forward ---
        self.prev_ts = ts;
        self.prev_mid = mid;
        self.prev_bid_sz = qb;
        self.prev_ask_sz = qa;
        if is_trade {
            self.prev_trade_px = p;
        }
        self.last_sequence = seq;
    }

    fn step_liquidation(&mut self, side: i8, p: f64, q: f64, seq: u32, flags: u8) {
        self.liq = match self.liq {
            LiquidationRun::Idle => LiquidationRun::Running {
                side,
                start_price: p,
                extremum: p,
                volume: q,
                last_sequence: seq,
            },
            LiquidationRun::Running {
                side: run_side,
                start_price,
                extremum,
                volume,
                ..
            } => {
                let retrace = (run_side > 0 && p < extremum) || (run_side < 0 && p > extremum);
                if side != run_side || retrace {
                    // Run broken: a fresh run begins on this very trade.
                    LiquidationRun::Running {
                        side,
                        start_price: p,
                        extremum: p,
                        volume: q,
                        last_sequence: seq,
                    }
                } else {
                    LiquidationRun::Running {
                        side: run_side,
                        start_price,
                        extremum: if run_side > 0 {
                            extremum.max(p)
                        } else {
                            extremum.min(p)
                        },
                        volume: volume + q,
                        last_sequence: seq,
                    }
                }
            }
        };

        if let LiquidationRun::Running {
            side,
            start_price,
            volume,
            ..
        } = self.liq
        {
            let mut strength = volume * (1.0 + (p - start_price).abs() * 100.0) * side as f64;
            if flags & self.liq_flag_mask != 0 {
                strength *= 2.0;
            }
            self.liq_strength = strength;
        }
    }

    fn invalidate(&mut self) {
        self.ofi_win.reset();
        self.bid_depth_win.reset();
        self.ask_depth_win.reset();
        self.urgency_win.reset();
        self.sweep_win.reset();
        self.liq = LiquidationRun::Idle;
        self.liq_strength = 0.0;
        self.valid_hist = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One synthetic TBBO event; defaults describe a quiet book at 100/100.01.
    #[derive(Clone, Copy)]
    struct Ev {
        ts: u64,
        price: f64,
        size: f64,
        side: i8,
        action: i8,
        flags: u8,
        seq: u32,
        bid_px: f64,
        ask_px: f64,
        bid_sz: f64,
        ask_sz: f64,
        bid_ct: u32,
        ask_ct: u32,
    }

    impl Default for Ev {
        fn default() -> Self {
            Self {
                ts: 0,
                price: 100.0,
                size: 1.0,
                side: 1,
                action: ACTION_TRADE,
                flags: 0,
                seq: 0,
                bid_px: 100.0,
                ask_px: 100.01,
                bid_sz: 50.0,
                ask_sz: 50.0,
                bid_ct: 10,
                ask_ct: 10,
            }
        }
    }

    fn build_cols(events: &[Ev]) -> TbboColumns {
        let mut cols = TbboColumns::new();
        for (i, e) in events.iter().enumerate() {
            cols.ts_event.push(if e.ts == 0 { i as u64 * 1_000_000 } else { e.ts });
            cols.ts_recv.push(cols.ts_event[i] + 500);
            cols.ts_in_delta.push(100);
            cols.prices.push(e.price);
            cols.sizes.push(e.size);
            cols.sides.push(e.side);
            cols.actions.push(e.action);
            cols.flags.push(e.flags);
            cols.depth.push(0);
            cols.sequences.push(if e.seq == 0 { i as u32 + 100 } else { e.seq });
            cols.bid_px.push(e.bid_px);
            cols.ask_px.push(e.ask_px);
            cols.bid_sz.push(e.bid_sz);
            cols.ask_sz.push(e.ask_sz);
            cols.bid_ct.push(e.bid_ct);
            cols.ask_ct.push(e.ask_ct);
            cols.publisher_id.push(1);
            cols.instrument_id.push(42);
        }
        cols.count = events.len();
        cols
    }

    fn run(events: &[Ev]) -> Vec<Atoms> {
        let cols = build_cols(events);
        let mut mp = MarketPhysics::new(0x80);
        mp.prime(&cols);
        let mut out = Vec::new();
        let mut atoms = Atoms::default();
        for i in 1..cols.count {
            mp.update_atoms(i, &cols, &mut atoms);
            out.push(atoms);
        }
        out
    }

    #[test]
    fn pure_replenishment_buy_has_positive_ofi() {
        // S1: trade buys 10, ask queue ends where it started.
        let events = [
            Ev { ask_sz: 100.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ask_sz: 100.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert!((atoms[0].ofi - 10.0).abs() < 1e-12);
    }

    #[test]
    fn ofi_sign_law() {
        // Exact consumption nets to zero.
        let exact = run(&[
            Ev { ask_sz: 100.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ask_sz: 90.0, ..Ev::default() },
        ]);
        assert!(exact[0].ofi.abs() < 1e-12);

        // Partial replenishment leaves positive flow.
        let replenished = run(&[
            Ev { ask_sz: 100.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ask_sz: 95.0, ..Ev::default() },
        ]);
        assert!(replenished[0].ofi > 0.0);

        // Cancellations beyond the trade flip the sign.
        let cancelled = run(&[
            Ev { ask_sz: 100.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ask_sz: 80.0, ..Ev::default() },
        ]);
        assert!(cancelled[0].ofi < 0.0);

        // Symmetric for sells: exact bid consumption nets to zero.
        let sell_exact = run(&[
            Ev { bid_sz: 100.0, ..Ev::default() },
            Ev { side: -1, size: 10.0, bid_sz: 90.0, ..Ev::default() },
        ]);
        assert!(sell_exact[0].ofi.abs() < 1e-12);
    }

    #[test]
    fn sweep_kappa_thresholds() {
        // S2: clearing the level exactly scores +1; 3x the level scores +3.
        let events = [
            Ev { ask_sz: 5.0, ..Ev::default() },
            Ev { side: 1, size: 5.0, ask_sz: 3.0, ..Ev::default() },
            Ev { side: 1, size: 9.0, ask_sz: 3.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert!((atoms[0].sweep_kappa - 1.0).abs() < 1e-12);
        // Second raw kappa from the two-sample mean: 2*mean - 1.
        let second_raw = 2.0 * atoms[1].sweep_kappa - 1.0;
        assert!((second_raw - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sub_threshold_trade_scores_zero_kappa() {
        let events = [
            Ev { ask_sz: 100.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert_eq!(atoms[0].sweep_kappa, 0.0);
    }

    #[test]
    fn sequence_gap_zeroes_derived_and_resets_windows() {
        // S3: sequences 100, 101, 103, 104.
        let events = [
            Ev { seq: 100, ask_sz: 100.0, ..Ev::default() },
            Ev { seq: 101, side: 1, size: 10.0, ask_sz: 100.0, ..Ev::default() },
            Ev { seq: 103, side: 1, size: 20.0, ask_sz: 100.0, ..Ev::default() },
            Ev { seq: 104, side: 1, size: 30.0, ask_sz: 100.0, ..Ev::default() },
        ];
        let atoms = run(&events);

        // Before the gap: normal processing.
        assert!((atoms[0].ofi - 10.0).abs() < 1e-12);

        // Gap event: all derived aggregates forced to zero.
        assert_eq!(atoms[1].ofi, 0.0);
        assert_eq!(atoms[1].crowding_skew, 0.0);
        assert_eq!(atoms[1].lat_urgency, 0.0);
        assert_eq!(atoms[1].sweep_kappa, 0.0);
        assert_eq!(atoms[1].liq_strength, 0.0);

        // Resumed event: window holds the gap event's seed (20) plus this
        // event's 30, proving the reset left count = 1.
        assert!((atoms[2].ofi - 25.0).abs() < 1e-12);
    }

    #[test]
    fn liquidation_run_grows_then_resets_on_retrace() {
        // S4: five buys marching up, then a sixth below the extremum.
        let mut events = vec![Ev { ask_sz: 1000.0, ..Ev::default() }];
        for k in 0..5u32 {
            events.push(Ev {
                side: 1,
                size: 10.0,
                price: 100.0 + k as f64 * 0.01,
                ask_sz: 1000.0,
                ..Ev::default()
            });
        }
        events.push(Ev {
            side: 1,
            size: 7.0,
            price: 100.01, // below the 100.04 extremum
            ask_sz: 1000.0,
            ..Ev::default()
        });

        let atoms = run(&events);
        for w in atoms[..5].windows(2) {
            assert!(w[1].liq_strength > w[0].liq_strength);
        }
        // Reset run: strength recomputed from the retracing trade alone.
        let last = atoms[5].liq_strength;
        assert!((last - 7.0).abs() < 1e-12);
    }

    #[test]
    fn opposite_side_trade_restarts_run() {
        let events = [
            Ev { ask_sz: 1000.0, bid_sz: 1000.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ..Ev::default() },
            Ev { side: -1, size: 4.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert!(atoms[1].liq_strength > atoms[0].liq_strength);
        assert!((atoms[2].liq_strength + 4.0).abs() < 1e-12);
    }

    #[test]
    fn liq_strength_decays_on_book_updates() {
        let events = [
            Ev { ask_sz: 1000.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ..Ev::default() },
            Ev { action: b'A' as i8, size: 0.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert!((atoms[1].liq_strength - atoms[0].liq_strength * 0.95).abs() < 1e-12);
    }

    #[test]
    fn liquidation_flag_doubles_strength() {
        let flagged = run(&[
            Ev { ask_sz: 1000.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, flags: 0x80, ..Ev::default() },
        ]);
        let plain = run(&[
            Ev { ask_sz: 1000.0, ..Ev::default() },
            Ev { side: 1, size: 10.0, ..Ev::default() },
        ]);
        assert!((flagged[0].liq_strength - 2.0 * plain[0].liq_strength).abs() < 1e-12);
    }

    #[test]
    fn whale_shock_fires_when_trade_dwarfs_book() {
        let events = [
            Ev::default(),
            Ev { size: 150.0, bid_sz: 50.0, ask_sz: 50.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert_eq!(atoms[0].whale_shock, 1.0);
    }

    #[test]
    fn mid_falls_back_to_trade_price_on_empty_book() {
        let events = [
            Ev::default(),
            Ev { price: 99.5, bid_px: 0.0, ask_px: 0.0, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert_eq!(atoms[0].mid, 99.5);
    }

    #[test]
    fn cent_magnet_peaks_on_round_prices() {
        let events = [
            Ev::default(),
            Ev { price: 101.0, ..Ev::default() },
            Ev { price: 101.5, ..Ev::default() },
        ];
        let atoms = run(&events);
        assert!((atoms[0].cent_magnet - 1.0).abs() < 1e-12);
        assert!(atoms[1].cent_magnet.abs() < 1e-12);
    }
}
