//! I/O module
//!
//! Handles report output.
//!
//! # Components
//!
//! - `csv_format` - Phase summary and account balance CSV serialization

pub mod csv_format;

pub use csv_format::{write_balances_csv, write_phase_summary_csv};
