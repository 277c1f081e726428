//! Fixed-width report tables for the study and forensics verbs.
//!
//! Pure formatting over the accumulators; nothing here feeds back into
//! the engine. Output is plain stdout so runs can be piped or diffed.

use chrono::Utc;

use crate::forensics::ForensicsReport;
use crate::horizon::{HORIZON_NAMES, HZ_COUNT};
use crate::physics::AtomId;
use crate::signals::SignalId;
use crate::stats::{Bucket, Portfolio, StudyAggregator};
use crate::study::StudySummary;

/// IS→OOS decay beyond which an atom is flagged as fading.
const DECAY_WARN_PCT: f64 = 40.0;

/// |t| below which the OOS edge is indistinguishable from noise.
const T_STAT_FLOOR: f64 = 2.0;

/// Print the per-atom IC table with the IS/OOS split.
pub fn print_atom_report(agg: &StudyAggregator, summary: &StudySummary) {
    println!(
        "\n=== ATOM STUDY | {} tapes, {} rows | {} ===",
        summary.files,
        summary.rows,
        Utc::now().format("%Y-%m-%d %H:%M:%SZ")
    );

    for atom in AtomId::ALL {
        println!("\n>> {} <<", atom.name());
        println!(
            "{:<8} {:>9} {:>9} {:>9} {:>8} {:>8}  {}",
            "HORIZON", "IC(IS)", "IC(OOS)", "DECAY%", "T-STAT", "SHARPE", "STATUS"
        );

        let mut prev_ic = 0.0;
        let mut monotonic = true;

        for h in 0..HZ_COUNT {
            let is = agg.cell(atom, h, Bucket::InSample).calculate();
            let oos = agg.cell(atom, h, Bucket::OutOfSample).calculate();

            let decay = if is.ic.abs() > 1e-5 {
                (1.0 - oos.ic / is.ic) * 100.0
            } else {
                0.0
            };

            let status = if oos.t_stat.abs() < T_STAT_FLOOR {
                "NO_SIG"
            } else if decay > DECAY_WARN_PCT {
                "DECAY"
            } else if decay < -DECAY_WARN_PCT {
                "REGIME"
            } else {
                "OK"
            };

            println!(
                "{:<8} {:>9.4} {:>9.4} {:>8.1}% {:>8.1} {:>8.2}  {}",
                HORIZON_NAMES[h], is.ic, oos.ic, decay, oos.t_stat, oos.sharpe, status
            );

            if h > 0 && ((is.ic > 0.0) != (prev_ic > 0.0)) && is.ic != 0.0 && prev_ic != 0.0 {
                monotonic = false;
            }
            prev_ic = is.ic;
        }
        println!("Monotonic: {}", if monotonic { "YES" } else { "NO" });
    }
}

/// Print the per-symbol signal backtest tables.
pub fn print_signal_report(portfolio: &Portfolio) {
    for report in portfolio.reports() {
        println!("\n=== SIGNALS | {} ===", report.symbol());
        let cells = report.lock_cells();

        for sig in SignalId::ALL {
            println!("\n>> {} <<", sig.name());
            println!(
                "{:<8} {:>8} {:>8} {:>8} {:>7} {:>7} {:>8} {:>8} {:>7} {:>9} {:>9}",
                "HORIZON", "N", "IC", "RANKIC", "HIT%", "NMI", "dLL", "SHARPE", "WIN%", "MAXDD",
                "P05"
            );

            for h in 0..HZ_COUNT {
                let ic = cells.ic_cell(sig, h);
                let trades = cells.trade_cell(sig, h);
                let (_, nmi) = ic.mutual_information(0, 0);
                let (_, _, delta_ll) = ic.delta_log_loss();

                println!(
                    "{:<8} {:>8} {:>8.4} {:>8.4} {:>6.1}% {:>7.4} {:>8.5} {:>8.3} {:>6.1}% {:>9.5} {:>9.5}",
                    HORIZON_NAMES[h],
                    ic.count(),
                    ic.pearson_ic(),
                    ic.rank_ic(),
                    ic.hit_rate() * 100.0,
                    nmi,
                    delta_ll,
                    trades.sharpe(),
                    trades.win_rate(),
                    trades.max_drawdown(),
                    trades.tail_percentile(0.05),
                );
            }
        }
    }
}

/// Print the forensics table.
pub fn print_forensics(reports: &[ForensicsReport]) {
    println!(
        "{:<28} {:>10} {:>9} {:>9} {:>12} {:>7}  {}",
        "FILE", "TICKS", "GAP>1s%", "GAP>60s%", "MAX_GAP", "BAD_PX", "STATUS"
    );
    for r in reports {
        println!(
            "{:<28} {:>10} {:>8.3}% {:>8.3}% {:>12} {:>7}  {}",
            r.file,
            r.ticks,
            r.frac_1s(),
            r.frac_60s(),
            format_gap(r.max_gap_ns),
            r.bad_prices,
            r.status
        );
    }
}

/// Render a nanosecond gap as a human duration.
fn format_gap(ns: u64) -> String {
    let ms = ns / 1_000_000;
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else if ms < 3_600_000 {
        format!("{:.1}m", ms as f64 / 60_000.0)
    } else {
        format!("{:.1}h", ms as f64 / 3_600_000.0)
    }
}
