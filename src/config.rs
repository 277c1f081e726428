//! Run configuration: concurrency caps, study tunables, per-asset tables.
//!
//! Configurations are plain serde structs with TOML and JSON round-trips,
//! validated on load, so a study run can be pinned to a file and
//! reproduced later.
//!
//! # Example
//!
//! ```ignore
//! use quantdev::config::StudyConfig;
//!
//! let config = StudyConfig::default();
//! config.save_toml("study.toml")?;
//! let loaded = StudyConfig::load_toml("study.toml")?;
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Vendor flag bits carried per record (bit 0 = LSB).
pub mod flags {
    /// End of event burst.
    pub const LAST: u8 = 1 << 0;
    pub const SNAPSHOT: u8 = 1 << 1;
    pub const MBP: u8 = 1 << 2;
    pub const TOB: u8 = 1 << 3;
    pub const PUBLISHER_SPECIFIC: u8 = 1 << 4;
    /// Capture timestamp is unreliable; forensics skips these records.
    pub const BAD_TS_RECV: u8 = 1 << 5;
    pub const MAYBE_BAD_BOOK: u8 = 1 << 6;
    /// Forced/liquidation print. Dataset-specific: some feeds repurpose
    /// bit 7, so the mask is configurable via [`super::StudyConfig`].
    pub const LIQUIDATION: u8 = 1 << 7;
}

/// Fixed-point price scale on the vendor wire: 1e-9 per unit.
pub const PX_SCALE: f64 = 1e-9;

/// Engine-wide study configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Fraction of each tape held out as the out-of-sample suffix.
    pub oos_ratio: f64,

    /// Workers for streaming ingest; disk-bound, ~8 is near-optimal on NVMe.
    pub io_threads: usize,

    /// Workers for the CPU-bound atom study; 0 means one per logical CPU.
    pub cpu_threads: usize,

    /// Workers for the memory-heavy per-tape backtest pass.
    pub backtest_threads: usize,

    /// Tapes shorter than this are skipped by the atom study.
    pub min_rows_study: usize,

    /// Tapes shorter than this are skipped by the signal backtest.
    pub min_rows_backtest: usize,

    /// Flag bit(s) treated as forced/liquidation prints.
    pub liq_flag_mask: u8,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            oos_ratio: 0.30,
            io_threads: 8,
            cpu_threads: 0,
            backtest_threads: 4,
            min_rows_study: 1_000,
            min_rows_backtest: 2_000,
            liq_flag_mask: flags::LIQUIDATION,
        }
    }
}

impl StudyConfig {
    /// Resolve the CPU pool size, falling back to the logical CPU count.
    pub fn effective_cpu_threads(&self) -> usize {
        if self.cpu_threads > 0 {
            self.cpu_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Validate ranges; called by every loader.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.oos_ratio) {
            return Err(format!("oos_ratio must be in [0, 1), got {}", self.oos_ratio));
        }
        if self.io_threads == 0 {
            return Err("io_threads must be > 0".to_string());
        }
        if self.backtest_threads == 0 {
            return Err("backtest_threads must be > 0".to_string());
        }
        Ok(())
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let config: StudyConfig = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let config: StudyConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }
}

/// Per-symbol tunables used by the signal backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    /// Dollar value of one tick.
    pub tick_value: f64,
    /// Round-trip cost per contract, dollars.
    pub cost_per_trade: f64,
    /// Basis-point multiplier for display scaling.
    pub bps_multiplier: f64,
    /// |liq_strength| at or below this is treated as noise by the
    /// liquidation signal.
    pub liq_threshold: f64,
}

/// Built-in table for the micro futures this engine is pointed at most
/// often; unknown symbols get a neutral fallback.
pub fn asset_config_for(symbol: &str) -> AssetConfig {
    match symbol {
        "MES" => AssetConfig {
            symbol: "MES".to_string(),
            tick_value: 1.25,
            cost_per_trade: 0.62,
            bps_multiplier: 2.50,
            liq_threshold: 50.0,
        },
        "MNQ" => AssetConfig {
            symbol: "MNQ".to_string(),
            tick_value: 0.50,
            cost_per_trade: 0.62,
            bps_multiplier: 2.00,
            liq_threshold: 50.0,
        },
        "MGC" => AssetConfig {
            symbol: "MGC".to_string(),
            tick_value: 1.00,
            cost_per_trade: 1.62,
            bps_multiplier: 10.0,
            liq_threshold: 50.0,
        },
        other => AssetConfig {
            symbol: other.to_string(),
            tick_value: 1.0,
            cost_per_trade: 0.0,
            bps_multiplier: 1.0,
            liq_threshold: 50.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(StudyConfig::default().validate().is_ok());
    }

    #[test]
    fn oos_ratio_bounds_are_enforced() {
        let mut config = StudyConfig::default();
        config.oos_ratio = 1.0;
        assert!(config.validate().is_err());
        config.oos_ratio = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");

        let mut config = StudyConfig::default();
        config.cpu_threads = 12;
        config.liq_flag_mask = 0x40;
        config.save_toml(&path).unwrap();

        let loaded = StudyConfig::load_toml(&path).unwrap();
        assert_eq!(loaded.cpu_threads, 12);
        assert_eq!(loaded.liq_flag_mask, 0x40);
        assert_eq!(loaded.oos_ratio, config.oos_ratio);
    }

    #[test]
    fn known_assets_have_specific_costs() {
        assert_eq!(asset_config_for("MGC").cost_per_trade, 1.62);
        let fallback = asset_config_for("ZZZ");
        assert_eq!(fallback.cost_per_trade, 0.0);
        assert_eq!(fallback.symbol, "ZZZ");
    }

    #[test]
    fn liquidation_flag_is_bit_seven() {
        assert_eq!(flags::LIQUIDATION, 0x80);
        assert_eq!(StudyConfig::default().liq_flag_mask, 0x80);
    }
}
