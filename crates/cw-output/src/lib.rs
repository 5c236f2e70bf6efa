//! `cw-output`: report writers for the cauldron_watch engine.
//!
//! | Backend | Files created                                                              |
//! |---------|----------------------------------------------------------------------------|
//! | CSV     | `drain_events.csv`, `discrepancies.csv`, `unlogged_drains.csv`, `route_plan.csv` |
//!
//! Backends implement [`ReportWriter`]; [`write_report`] drives one with a
//! complete [`EngineReport`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use cw_output::{write_report, CsvReportWriter, EngineReport};
//!
//! let mut writer = CsvReportWriter::new(Path::new("./out"))?;
//! write_report(&mut writer, &EngineReport { events, reconciliation, schedule: Some(outcome) })?;
//! ```

pub mod csv;
pub mod error;
pub mod report;
pub mod row;
pub mod writer;


pub use crate::csv::CsvReportWriter;
pub use error::{OutputError, OutputResult};
pub use report::{write_report, EngineReport};
pub use row::{DiscrepancyRow, DrainEventRow, RouteStopRow, UnloggedDrainRow};
pub use writer::ReportWriter;
