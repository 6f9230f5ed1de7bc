//! CSV output for phase summaries and account balances
//!
//! Both writers take any `Write` so they can target stdout, a file or an
//! in-memory buffer in tests.

use crate::scenario::PhaseOutcome;
use crate::types::{AccountSnapshot, SimulationError};
use csv::Writer;
use std::io::Write;

/// Write one `phase,status,detail` row per phase outcome, in run order
pub fn write_phase_summary_csv(
    phases: &[PhaseOutcome],
    output: &mut dyn Write,
) -> Result<(), SimulationError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(["phase", "status", "detail"])?;
    for phase in phases {
        writer.write_record([
            phase.kind().name(),
            phase.status().label(),
            phase.detail().as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write account balances as `account,balance`
///
/// Rows are sorted by account id for deterministic output.
pub fn write_balances_csv(
    balances: &[AccountSnapshot],
    output: &mut dyn Write,
) -> Result<(), SimulationError> {
    let mut writer = Writer::from_writer(output);

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|snapshot| snapshot.account);

    // serialize() emits the header from the struct's field names
    for snapshot in &sorted {
        writer.serialize(snapshot)?;
    }
    if sorted.is_empty() {
        writer.write_record(["account", "balance"])?;
    }

    writer.flush()?;
    Ok(())
}
