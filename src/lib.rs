//! QuantDev
//!
//! Microstructure research engine for TBBO (top-of-book-on-trade) market
//! data tapes. Vendor wire files are transcoded into a columnar binary
//! tape built for repeated analytical passes, then a streaming event-time
//! engine computes a fixed family of predictive atoms per event and
//! aggregates their statistical relationship to future mid-price returns
//! at 10s/20s/30s horizons.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         quantdev                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ingest/     - vendor wire records → columnar tape              │
//! │  tape/       - on-disk format, encoder/decoder, pooled buffers  │
//! │  physics/    - rolling windows, atom vector, liquidation runs   │
//! │  horizon     - amortized forward cursors for future-mid targets │
//! │  signals     - atoms → clamped signal vector                    │
//! │  stats/      - IC, rank IC, MI, Δ log-loss, drawdown, tails     │
//! │  study       - parallel fan-out over tapes, global merge        │
//! │  forensics   - gap and bad-price scan                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Data flow
//!
//! ```text
//! *.dbn → TapeEncoder → *.quantdev → TbboColumns
//!       → {MarketPhysics, HorizonCursors, SignalEngine} per event
//!       → {StudyAggregator, SymbolReport} → Portfolio
//! ```
//!
//! # Example
//!
//! ```ignore
//! use quantdev::config::StudyConfig;
//! use quantdev::study;
//!
//! let config = StudyConfig::default();
//! let (atoms, portfolio, summary) = study::run_test(".".as_ref(), &config)?;
//! ```

pub mod config;
pub mod forensics;
pub mod horizon;
pub mod ingest;
pub mod physics;
pub mod report;
pub mod signals;
pub mod stats;
pub mod study;
pub mod tape;

// Re-exports - Tape
pub use tape::{ColumnPool, TapeEncoder, TapeError, TapeRow, TbboColumns};

// Re-exports - Physics
pub use physics::{AtomId, Atoms, LiquidationRun, MarketPhysics, RollingMean, ATOM_COUNT};

// Re-exports - Horizons & signals
pub use horizon::{HorizonCursors, HORIZON_DURATIONS_NS, HZ_COUNT};
pub use signals::{SignalEngine, SignalId, SIGNAL_COUNT};

// Re-exports - Statistics
pub use stats::{AdvancedStats, ICStats, Portfolio, RobustStats, StudyAggregator, SymbolReport};

// Re-exports - Config
pub use config::{asset_config_for, AssetConfig, StudyConfig};
