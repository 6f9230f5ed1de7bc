//! Bank Lock Simulator CLI
//!
//! Runs the concurrency scenario and reports each phase.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --phase deadlock
//! cargo run -- --phase avoidance --max-attempts 3 --backoff-min-ms 10 --backoff-max-ms 20
//! cargo run -- --work-delay-ms 0 --hazard-delay-ms 0 --quiet --balances balances.csv
//! ```
//!
//! Progress is logged to stderr. A `phase,status,detail` summary is written to
//! stdout, and `--balances` writes the final account balances to a CSV file.
//!
//! # Exit Codes
//!
//! - 0: Every phase ran; observed races, deadlocks and aborted transfers are expected
//! - 1: A phase failed its invariant or was rejected, or a fatal error occurred

use bank_lock_sim::cli::{self, CliArgs};
use bank_lock_sim::scenario::{ScenarioDriver, SimulationReport};
use bank_lock_sim::{io, logging, SimulationError};
use std::fs::File;
use std::process;
use tracing::error;

fn main() {
    let args = cli::parse_args();
    logging::init(args.quiet);

    match run(&args) {
        Ok(report) if report.all_phases_succeeded() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

fn run(args: &CliArgs) -> Result<SimulationReport, SimulationError> {
    let mut driver = ScenarioDriver::new(args.to_config())?;
    let report = driver.run(args.phase)?;

    let mut output = std::io::stdout();
    io::write_phase_summary_csv(&report.phases, &mut output)?;

    if let Some(path) = &args.balances {
        let mut file = File::create(path)?;
        io::write_balances_csv(&report.final_balances, &mut file)?;
    }

    Ok(report)
}
