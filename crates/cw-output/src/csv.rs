//! CSV report backend.
//!
//! Creates four files in the configured output directory:
//! - `drain_events.csv`
//! - `discrepancies.csv`
//! - `unlogged_drains.csv`
//! - `route_plan.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::ReportWriter;
use crate::{DiscrepancyRow, DrainEventRow, OutputResult, RouteStopRow, UnloggedDrainRow};

pub struct CsvReportWriter {
    events:        Writer<File>,
    discrepancies: Writer<File>,
    unlogged:      Writer<File>,
    routes:        Writer<File>,
    finished:      bool,
}

impl CsvReportWriter {
    /// Create `dir` if needed, open the four files, and write the headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut events = Writer::from_path(dir.join("drain_events.csv"))?;
        events.write_record([
            "reservoir_id", "start", "end", "level_at_start", "level_at_end", "inferred_fill", "total_removed",
            "anomaly",
        ])?;

        let mut discrepancies = Writer::from_path(dir.join("discrepancies.csv"))?;
        discrepancies.write_record([
            "reservoir_id", "date", "reported_volume", "computed_volume", "delta", "classification", "severity",
            "ticket_ids",
        ])?;

        let mut unlogged = Writer::from_path(dir.join("unlogged_drains.csv"))?;
        unlogged.write_record(["reservoir_id", "date", "total_removed", "event_count"])?;

        let mut routes = Writer::from_path(dir.join("route_plan.csv"))?;
        routes.write_record(["courier_id", "seq", "node_id", "kind", "arrival", "departure", "volume"])?;

        Ok(Self { events, discrepancies, unlogged, routes, finished: false })
    }
}

fn vol(v: f64) -> String {
    format!("{v:.3}")
}

impl ReportWriter for CsvReportWriter {
    fn write_drain_events(&mut self, rows: &[DrainEventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.reservoir_id.clone(),
                row.start.clone(),
                row.end.clone(),
                vol(row.level_at_start),
                vol(row.level_at_end),
                vol(row.inferred_fill),
                vol(row.total_removed),
                row.anomaly.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_discrepancies(&mut self, rows: &[DiscrepancyRow]) -> OutputResult<()> {
        for row in rows {
            self.discrepancies.write_record(&[
                row.reservoir_id.clone(),
                row.date.clone(),
                vol(row.reported_volume),
                vol(row.computed_volume),
                vol(row.delta),
                row.classification.to_owned(),
                row.severity.clone(),
                row.ticket_ids.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_unlogged_drains(&mut self, rows: &[UnloggedDrainRow]) -> OutputResult<()> {
        for row in rows {
            self.unlogged.write_record(&[
                row.reservoir_id.clone(),
                row.date.clone(),
                vol(row.total_removed),
                row.event_count.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_route_stops(&mut self, rows: &[RouteStopRow]) -> OutputResult<()> {
        for row in rows {
            self.routes.write_record(&[
                row.courier_id.clone(),
                row.seq.to_string(),
                row.node_id.clone(),
                row.kind.to_owned(),
                row.arrival.clone(),
                row.departure.clone(),
                vol(row.volume),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.discrepancies.flush()?;
        self.unlogged.flush()?;
        self.routes.flush()?;
        Ok(())
    }
}
