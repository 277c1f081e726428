//! The per-event atom vector.
//!
//! Every TBBO event is reduced to a fixed family of scalar features
//! ("atoms") grouped by what they measure:
//!
//! - **Flow**: who is hitting and how hard
//! - **Friction**: what crossing costs right now
//! - **Value**: where price "is" beneath the last trade
//! - **Time**: event pacing and capture latency
//! - **Derived**: rolling aggregates maintained by the physics state
//!
//! Atoms are raw, unscaled inputs; the signal layer applies scaling and
//! clamping. Sign convention throughout: positive = bullish pressure.

/// Fixed per-event feature record. All divisions feeding these values are
/// guarded by [`crate::physics::EPSILON`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Atoms {
    // --- Flow ---
    /// s · ln(1+q): log-damped signed trade volume.
    pub signed_vol: f64,
    /// Aggressor side as a real: +1 buy, -1 sell, 0 unknown.
    pub trade_sign: f64,
    /// (p − previous trade price) · s: realized move in aggressor direction.
    pub price_impact: f64,
    /// signed_vol / ln(e + Δt): volume per unit of log-time.
    pub signed_velocity: f64,
    /// 1 when the trade exceeds both visible top-of-book queues combined.
    pub whale_shock: f64,
    /// s · vol_imbalance: does the aggressor lean with the book.
    pub pressure_align: f64,

    // --- Friction ---
    /// ask − bid.
    pub quoted_spread: f64,
    /// (p − mid) / max(spread, ε): aggressor deviation, spread-normalized.
    pub effective_spread: f64,
    /// |Δp| / (ln(1+q) + 1): instantaneous Amihud illiquidity.
    pub instant_amihud: f64,
    /// Log-space size imbalance of the top-of-book queues, in [-1, 1].
    pub vol_imbalance: f64,
    /// Log-space order-count imbalance, in [-1, 1].
    pub count_imbalance: f64,

    // --- Value ---
    /// (bid + ask)/2, falling back to the trade price on an empty book.
    pub mid: f64,
    /// Size-weighted microprice (B·Qa + A·Qb)/(Qa + Qb).
    pub micro: f64,
    /// (micro − mid) · 1e4.
    pub micro_dev: f64,
    /// Proximity of the trade price to the nearest whole-dollar level:
    /// 1 at the level, 0 halfway between levels.
    pub cent_magnet: f64,
    /// Average resting order size on the bid, Qb / max(1, Nb).
    pub avg_sz_bid: f64,
    /// Average resting order size on the ask, Qa / max(1, Na).
    pub avg_sz_ask: f64,

    // --- Time ---
    /// Inter-event duration in ns, clamped to ≥ 1.
    pub inter_trade_dur: u64,
    /// ts_recv − ts_event, ns.
    pub capture_lat: i64,
    /// Engine processing lag from the feed, ns.
    pub send_delta: i32,

    // --- Derived (rolling-window aggregates) ---
    /// Rolling mean of per-event order-flow imbalance.
    pub ofi: f64,
    /// Rolling avg bid order size minus rolling avg ask order size.
    pub crowding_skew: f64,
    /// Rolling mean of latency-adjusted trade urgency.
    pub lat_urgency: f64,
    /// Rolling mean of the level-clear ratio (κ).
    pub sweep_kappa: f64,
    /// Output of the liquidation run sub-state.
    pub liq_strength: f64,
}

/// Identifies one atom for reporting and study aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum AtomId {
    SignedVol,
    TradeSign,
    PriceImpact,
    SignedVelocity,
    WhaleShock,
    PressureAlign,
    QuotedSpread,
    EffectiveSpread,
    InstantAmihud,
    VolImbalance,
    CountImbalance,
    Mid,
    Micro,
    MicroDev,
    CentMagnet,
    AvgSzBid,
    AvgSzAsk,
    InterTradeDur,
    CaptureLat,
    SendDelta,
    Ofi,
    CrowdingSkew,
    LatUrgency,
    SweepKappa,
    LiqStrength,
}

/// Number of atoms in the vector.
pub const ATOM_COUNT: usize = 25;

impl AtomId {
    /// All atoms, in vector order.
    pub const ALL: [AtomId; ATOM_COUNT] = [
        AtomId::SignedVol,
        AtomId::TradeSign,
        AtomId::PriceImpact,
        AtomId::SignedVelocity,
        AtomId::WhaleShock,
        AtomId::PressureAlign,
        AtomId::QuotedSpread,
        AtomId::EffectiveSpread,
        AtomId::InstantAmihud,
        AtomId::VolImbalance,
        AtomId::CountImbalance,
        AtomId::Mid,
        AtomId::Micro,
        AtomId::MicroDev,
        AtomId::CentMagnet,
        AtomId::AvgSzBid,
        AtomId::AvgSzAsk,
        AtomId::InterTradeDur,
        AtomId::CaptureLat,
        AtomId::SendDelta,
        AtomId::Ofi,
        AtomId::CrowdingSkew,
        AtomId::LatUrgency,
        AtomId::SweepKappa,
        AtomId::LiqStrength,
    ];

    /// Index into atom-keyed arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short display name used in report tables.
    pub const fn name(self) -> &'static str {
        match self {
            AtomId::SignedVol => "SignedLogVol",
            AtomId::TradeSign => "TradeSign",
            AtomId::PriceImpact => "PriceImpact",
            AtomId::SignedVelocity => "LogTimeVelocity",
            AtomId::WhaleShock => "WhaleShock",
            AtomId::PressureAlign => "PressureAlign",
            AtomId::QuotedSpread => "QuotedSpread",
            AtomId::EffectiveSpread => "AggressorDev",
            AtomId::InstantAmihud => "InstantAmihud",
            AtomId::VolImbalance => "LogVolImbalance",
            AtomId::CountImbalance => "LogCountImbalance",
            AtomId::Mid => "MidPrice",
            AtomId::Micro => "MicroPrice",
            AtomId::MicroDev => "MicroDev",
            AtomId::CentMagnet => "CentMagnet",
            AtomId::AvgSzBid => "AvgSzBid",
            AtomId::AvgSzAsk => "AvgSzAsk",
            AtomId::InterTradeDur => "InterTradeDur",
            AtomId::CaptureLat => "CaptureLat",
            AtomId::SendDelta => "SendDelta",
            AtomId::Ofi => "TrueOFI",
            AtomId::CrowdingSkew => "CrowdingSkew",
            AtomId::LatUrgency => "LatUrgency",
            AtomId::SweepKappa => "SweepKappa",
            AtomId::LiqStrength => "LiqStrength",
        }
    }
}

impl Atoms {
    /// Read one atom by id, as `f64`.
    #[inline]
    pub fn get(&self, id: AtomId) -> f64 {
        match id {
            AtomId::SignedVol => self.signed_vol,
            AtomId::TradeSign => self.trade_sign,
            AtomId::PriceImpact => self.price_impact,
            AtomId::SignedVelocity => self.signed_velocity,
            AtomId::WhaleShock => self.whale_shock,
            AtomId::PressureAlign => self.pressure_align,
            AtomId::QuotedSpread => self.quoted_spread,
            AtomId::EffectiveSpread => self.effective_spread,
            AtomId::InstantAmihud => self.instant_amihud,
            AtomId::VolImbalance => self.vol_imbalance,
            AtomId::CountImbalance => self.count_imbalance,
            AtomId::Mid => self.mid,
            AtomId::Micro => self.micro,
            AtomId::MicroDev => self.micro_dev,
            AtomId::CentMagnet => self.cent_magnet,
            AtomId::AvgSzBid => self.avg_sz_bid,
            AtomId::AvgSzAsk => self.avg_sz_ask,
            AtomId::InterTradeDur => self.inter_trade_dur as f64,
            AtomId::CaptureLat => self.capture_lat as f64,
            AtomId::SendDelta => self.send_delta as f64,
            AtomId::Ofi => self.ofi,
            AtomId::CrowdingSkew => self.crowding_skew,
            AtomId::LatUrgency => self.lat_urgency,
            AtomId::SweepKappa => self.sweep_kappa,
            AtomId::LiqStrength => self.liq_strength,
        }
    }
}
