//! The `ReportWriter` trait implemented by report backends.

use crate::{DiscrepancyRow, DrainEventRow, OutputResult, RouteStopRow, UnloggedDrainRow};

/// A sink for the engine's four report tables.
///
/// Each `write_*` call appends rows; nothing is assumed about call order.
pub trait ReportWriter {
    fn write_drain_events(&mut self, rows: &[DrainEventRow]) -> OutputResult<()>;

    fn write_discrepancies(&mut self, rows: &[DiscrepancyRow]) -> OutputResult<()>;

    fn write_unlogged_drains(&mut self, rows: &[UnloggedDrainRow]) -> OutputResult<()>;

    fn write_route_stops(&mut self, rows: &[RouteStopRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
