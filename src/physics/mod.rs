//! Market physics: per-event atom computation over a TBBO column stream.
//!
//! ```text
//! TbboColumns ──▶ MarketPhysics::update_atoms ──▶ Atoms (per event)
//!                     │
//!                     ├─ previous top-of-book snapshot
//!                     ├─ five rolling windows (OFI, bid/ask depth,
//!                     │  urgency, sweep)
//!                     └─ liquidation-run sub-state
//! ```
//!
//! Atom semantics live in [`engine`]; the shapes are in [`atoms`] and the
//! ring buffer in [`rolling`].

mod atoms;
mod engine;
mod rolling;

pub use atoms::{AtomId, Atoms, ATOM_COUNT};
pub use engine::{
    LiquidationRun, MarketPhysics, ACTION_TRADE, DEPTH_WINDOW, OFI_WINDOW, SWEEP_WINDOW,
    URGENCY_WINDOW,
};
pub use rolling::RollingMean;

/// Division guard used by every atom kernel.
pub const EPSILON: f64 = 1e-9;
