//! Plain data row types written by report backends.
//!
//! Instants are rendered as RFC 3339 UTC strings, dates as `YYYY-MM-DD`.

use chrono::{DateTime, SecondsFormat, Utc};

use cw_reconcile::{Discrepancy, UnloggedDrain};
use cw_schedule::RoutePlan;
use cw_telemetry::{DrainAnomaly, DrainEvent};

fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One detected drain event.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainEventRow {
    pub reservoir_id:   String,
    pub start:          String,
    pub end:            String,
    pub level_at_start: f64,
    pub level_at_end:   f64,
    pub inferred_fill:  f64,
    pub total_removed:  f64,
    /// Empty when the event is clean.
    pub anomaly:        String,
}

impl From<&DrainEvent> for DrainEventRow {
    fn from(e: &DrainEvent) -> Self {
        Self {
            reservoir_id:   e.site.to_string(),
            start:          instant(e.start),
            end:            instant(e.end),
            level_at_start: e.level_at_start,
            level_at_end:   e.level_at_end,
            inferred_fill:  e.inferred_fill,
            total_removed:  e.total_removed,
            anomaly:        match e.anomaly {
                None => String::new(),
                Some(DrainAnomaly::LevelRose) => "level_rose".into(),
                Some(DrainAnomaly::Clamped) => "clamped".into(),
            },
        }
    }
}

/// One ticket-date comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscrepancyRow {
    pub reservoir_id:    String,
    pub date:            String,
    pub reported_volume: f64,
    pub computed_volume: f64,
    pub delta:           f64,
    pub classification:  &'static str,
    pub severity:        String,
    /// `;`-separated.
    pub ticket_ids:      String,
}

impl From<&Discrepancy> for DiscrepancyRow {
    fn from(d: &Discrepancy) -> Self {
        Self {
            reservoir_id:    d.site.to_string(),
            date:            d.date.to_string(),
            reported_volume: d.reported,
            computed_volume: d.computed,
            delta:           d.delta,
            classification:  d.classification.as_str(),
            severity:        format!("{:?}", d.severity).to_lowercase(),
            ticket_ids:      d.ticket_ids.join(";"),
        }
    }
}

/// Drains on a date with no ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct UnloggedDrainRow {
    pub reservoir_id:  String,
    pub date:          String,
    pub total_removed: f64,
    pub event_count:   usize,
}

impl From<&UnloggedDrain> for UnloggedDrainRow {
    fn from(u: &UnloggedDrain) -> Self {
        Self {
            reservoir_id:  u.site.to_string(),
            date:          u.date.to_string(),
            total_removed: u.total_removed,
            event_count:   u.event_count,
        }
    }
}

/// One stop of one courier's route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStopRow {
    pub courier_id: String,
    /// 1-based position within the courier's route.
    pub seq:        usize,
    pub node_id:    String,
    pub kind:       &'static str,
    pub arrival:    String,
    pub departure:  String,
    pub volume:     f64,
}

impl RouteStopRow {
    /// Every stop of `plan`, courier by courier.
    pub fn from_plan(plan: &RoutePlan) -> Vec<Self> {
        plan.couriers
            .iter()
            .flat_map(|route| {
                route.stops.iter().enumerate().map(move |(i, stop)| Self {
                    courier_id: route.courier.to_string(),
                    seq:        i + 1,
                    node_id:    stop.site.to_string(),
                    kind:       stop.kind.as_str(),
                    arrival:    instant(stop.arrival),
                    departure:  instant(stop.departure),
                    volume:     stop.volume,
                })
            })
            .collect()
    }
}
