//! Statistics accumulators with bounded memory.
//!
//! Two shapes, chosen by what the metric needs:
//!
//! - [`RobustStats`]: sufficient statistics only. Streaming, `Copy`,
//!   exactly mergeable. Enough for Pearson IC, its t-statistic, and the
//!   Sharpe proxy.
//! - [`ICStats`] / [`AdvancedStats`]: bounded sample retention for the
//!   distribution-shaped metrics (rank IC, mutual information, Δ log-loss,
//!   tails), plus running moments that always include every observation.
//!
//! The retention policy is a simple head-keep up to a fixed cap, not true
//! reservoir sampling: merges stay trivially bounded appends.

mod advanced;
mod ic;
mod report;
mod robust;

pub use advanced::AdvancedStats;
pub use ic::ICStats;
pub use report::{
    Bucket, Portfolio, ReportCells, StudyAggregator, SymbolReport, BUCKET_COUNT,
};
pub use robust::{RobustStats, RobustSummary};

/// Cap on retained (signal, return) pairs per [`ICStats`] cell.
pub const MAX_IC_SAMPLES: usize = 100_000;

/// Cap on retained per-trade returns per [`AdvancedStats`] cell.
pub const MAX_RETURNS: usize = 100_000;
