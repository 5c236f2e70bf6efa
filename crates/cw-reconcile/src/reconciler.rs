//! Date-scoped reconciliation of tickets against drain events.
//!
//! # Matching
//!
//! Tickets have no time of day, so matching is by date-set membership:
//! every drain event of a reservoir is attributed to the local date its
//! `start` falls on (see [`DayBoundary`]), and all tickets of a reservoir on
//! one date are summed.  One [`Discrepancy`] is produced per
//! `(reservoir, date)` that has at least one ticket:
//!
//! ```text
//! computed = Σ total_removed  of the date's events
//! reported = Σ volume         of the date's tickets
//! delta    = computed − reported
//! ```
//!
//! # Classification
//!
//! With `band = tolerance.band(computed)`:
//!
//! | Condition                      | Classification  | Severity   |
//! |--------------------------------|-----------------|------------|
//! | no events on the date          | `UnderReported` | `Critical` |
//! | `abs(delta) <= band`           | `Matched`       | `Info`     |
//! | `reported < computed − band`   | `UnderReported` | `Warning`  |
//! | `reported > computed + band`   | `OverReported`  | `Warning`  |
//!
//! Events on a `(reservoir, date)` with no ticket at all become
//! [`UnloggedDrain`] findings instead.
//!
//! Reconciliation is a pure function of its inputs; running it twice on the
//! same tickets and events yields identical reports.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use cw_core::{DayBoundary, ReconcileConfig, SiteId, Tolerance};
use cw_telemetry::DrainEvent;

use crate::TransportTicket;

// ── Findings ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classification {
    Matched,
    UnderReported,
    OverReported,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Matched => "MATCHED",
            Classification::UnderReported => "UNDER-REPORTED",
            Classification::OverReported => "OVER-REPORTED",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    /// A ticket whose date shows no drain at all.
    Critical,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Discrepancy {
    pub site: SiteId,
    pub date: NaiveDate,
    pub reported: f64,
    pub computed: f64,
    /// `computed − reported`.
    pub delta: f64,
    pub classification: Classification,
    pub severity: Severity,
    /// Ids of the tickets summed into `reported`, where supplied.
    pub ticket_ids: Vec<String>,
    pub ticket_count: usize,
    pub event_count: usize,
}

/// Drain events on a date for which the reservoir has no ticket.
#[derive(Clone, Debug, PartialEq)]
pub struct UnloggedDrain {
    pub site: SiteId,
    pub date: NaiveDate,
    pub total_removed: f64,
    pub event_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconciliationReport {
    /// Sorted by reservoir, then date.
    pub discrepancies: Vec<Discrepancy>,
    /// Sorted by reservoir, then date.
    pub unlogged: Vec<UnloggedDrain>,
}

impl ReconciliationReport {
    pub fn count(&self, class: Classification) -> usize {
        self.discrepancies.iter().filter(|d| d.classification == class).count()
    }

    pub fn critical(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(|d| d.severity == Severity::Critical)
    }
}

/// Classify `reported` against `computed` within `tolerance`.
pub fn classify(reported: f64, computed: f64, tolerance: Tolerance) -> Classification {
    let band = tolerance.band(computed);
    if (computed - reported).abs() <= band {
        Classification::Matched
    } else if reported < computed - band {
        Classification::UnderReported
    } else {
        Classification::OverReported
    }
}

// ── TicketReconciler ──────────────────────────────────────────────────────────

#[derive(Default)]
struct DayTotals {
    reported: f64,
    ticket_ids: Vec<String>,
    ticket_count: usize,
    computed: f64,
    event_count: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TicketReconciler {
    cfg: ReconcileConfig,
    /// Per-reservoir day boundaries overriding `cfg.day_boundary`.
    boundaries: BTreeMap<SiteId, DayBoundary>,
}

impl TicketReconciler {
    pub fn new(cfg: ReconcileConfig) -> Self {
        Self { cfg, boundaries: BTreeMap::new() }
    }

    /// Use a different local day for one reservoir.
    pub fn with_site_boundary(mut self, site: impl Into<SiteId>, boundary: DayBoundary) -> Self {
        self.boundaries.insert(site.into(), boundary);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.cfg
    }

    pub fn day_boundary(&self, site: &SiteId) -> DayBoundary {
        self.boundaries.get(site).copied().unwrap_or(self.cfg.day_boundary)
    }

    /// The local date an event is attributed to.
    pub fn event_date(&self, event: &DrainEvent) -> NaiveDate {
        self.day_boundary(&event.site).local_date(event.start)
    }

    pub fn reconcile(&self, tickets: &[TransportTicket], events: &[DrainEvent]) -> ReconciliationReport {
        let mut days: BTreeMap<(SiteId, NaiveDate), DayTotals> = BTreeMap::new();

        for t in tickets {
            let day = days.entry((t.site.clone(), t.date)).or_default();
            day.reported += t.volume;
            day.ticket_count += 1;
            day.ticket_ids.extend(t.ticket_id.iter().cloned());
        }
        for e in events {
            let boundary = self.day_boundary(&e.site);
            let date = boundary.local_date(e.start);
            if boundary.local_date(e.end) != date {
                debug!(site = %e.site, start = %e.start, end = %e.end, %date, "event spans a day boundary; attributed to its start date");
            }
            let day = days.entry((e.site.clone(), date)).or_default();
            day.computed += e.total_removed;
            day.event_count += 1;
        }

        let mut report = ReconciliationReport::default();
        for ((site, date), mut day) in days {
            if day.ticket_count == 0 {
                debug!(%site, %date, total_removed = day.computed, "drain with no ticket");
                report.unlogged.push(UnloggedDrain {
                    site,
                    date,
                    total_removed: day.computed,
                    event_count: day.event_count,
                });
                continue;
            }

            let (classification, severity) = if day.event_count == 0 {
                warn!(%site, %date, reported = day.reported, "ticket with no detectable drain");
                (Classification::UnderReported, Severity::Critical)
            } else {
                match classify(day.reported, day.computed, self.cfg.tolerance) {
                    Classification::Matched => (Classification::Matched, Severity::Info),
                    other => (other, Severity::Warning),
                }
            };
            day.ticket_ids.sort();
            report.discrepancies.push(Discrepancy {
                delta: day.computed - day.reported,
                site,
                date,
                reported: day.reported,
                computed: day.computed,
                classification,
                severity,
                ticket_ids: day.ticket_ids,
                ticket_count: day.ticket_count,
                event_count: day.event_count,
            });
        }

        info!(
            discrepancies = report.discrepancies.len(),
            matched = report.count(Classification::Matched),
            under = report.count(Classification::UnderReported),
            over = report.count(Classification::OverReported),
            unlogged = report.unlogged.len(),
            "reconciliation complete",
        );
        report
    }
}
