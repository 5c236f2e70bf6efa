//! `write_report`: feeds a whole engine run to a [`ReportWriter`].

use tracing::info;

use cw_reconcile::ReconciliationReport;
use cw_schedule::FleetOutcome;
use cw_telemetry::DrainEvent;

use crate::writer::ReportWriter;
use crate::{DiscrepancyRow, DrainEventRow, OutputResult, RouteStopRow, UnloggedDrainRow};

/// Everything one run of the engine produced.
#[derive(Debug, Clone, Default)]
pub struct EngineReport {
    pub events: Vec<DrainEvent>,
    pub reconciliation: ReconciliationReport,
    /// `None` when scheduling was not requested.
    pub schedule: Option<FleetOutcome>,
}

/// Write every table of `report` and finish the writer.
pub fn write_report<W: ReportWriter>(writer: &mut W, report: &EngineReport) -> OutputResult<()> {
    let events: Vec<DrainEventRow> = report.events.iter().map(DrainEventRow::from).collect();
    writer.write_drain_events(&events)?;

    let discrepancies: Vec<DiscrepancyRow> =
        report.reconciliation.discrepancies.iter().map(DiscrepancyRow::from).collect();
    writer.write_discrepancies(&discrepancies)?;

    let unlogged: Vec<UnloggedDrainRow> = report.reconciliation.unlogged.iter().map(UnloggedDrainRow::from).collect();
    writer.write_unlogged_drains(&unlogged)?;

    let stops = match report.schedule.as_ref().and_then(FleetOutcome::plan) {
        Some(plan) => RouteStopRow::from_plan(plan),
        None => Vec::new(),
    };
    writer.write_route_stops(&stops)?;

    writer.finish()?;
    info!(
        events = events.len(),
        discrepancies = discrepancies.len(),
        unlogged = unlogged.len(),
        stops = stops.len(),
        "report written",
    );
    Ok(())
}
