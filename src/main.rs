//! CLI dispatcher: `data` (ingest), `test` (study), `check` (forensics).
//!
//! Each verb operates on matching files in the current working
//! directory. Exit code 0 on success, 1 on an unknown verb.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use quantdev::config::StudyConfig;
use quantdev::{forensics, ingest, report, study};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(verb) = args.get(1) else {
        print_help();
        return ExitCode::FAILURE;
    };

    let config = StudyConfig::default();
    let dir = Path::new(".");
    let start = Instant::now();

    let outcome = match verb.as_str() {
        "data" => run_data(dir, &config),
        "test" => run_test(dir, &config),
        "check" => run_check(dir),
        _ => {
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(()) => {
            println!("\n[sys] time: {:.2?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{verb} failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_data(dir: &Path, config: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!(">>> INGEST: wire (TBBO) -> quantdev tape <<<");
    let rows = ingest::run_data(dir, config)?;
    println!("ingested {rows} rows");
    Ok(())
}

fn run_test(dir: &Path, config: &StudyConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!(">>> STUDY: atoms + signals vs {}-horizon returns <<<", quantdev::HZ_COUNT);
    let (atoms, portfolio, summary) = study::run_test(dir, config)?;
    report::print_atom_report(&atoms, &summary);
    report::print_signal_report(&portfolio);
    Ok(())
}

fn run_check(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!(">>> FORENSICS: tape gap / bad-price scan <<<");
    let reports = forensics::run_check(dir)?;
    report::print_forensics(&reports);
    Ok(())
}

fn print_help() {
    println!("Usage: quantdev [data|test|check]");
    println!("  data  -> convert raw wire (.dbn) files to .quantdev tapes");
    println!("  test  -> run the atom study and signal backtest");
    println!("  check -> analyze tapes for gaps and bad prices");
}
