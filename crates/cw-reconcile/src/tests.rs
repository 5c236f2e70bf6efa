//! Unit tests for cw-reconcile.

#[cfg(test)]
mod helpers {
    use chrono::{DateTime, Duration, NaiveDate, Utc};

    use cw_core::SiteId;
    use cw_telemetry::DrainEvent;

    use crate::TransportTicket;

    pub fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// A 10-minute event starting at `start`.
    pub fn event(site: &str, start: &str, total_removed: f64) -> DrainEvent {
        let start = ts(start);
        DrainEvent {
            site: SiteId::new(site),
            start,
            end: start + Duration::minutes(10),
            level_at_start: total_removed,
            level_at_end: 0.0,
            inferred_fill: 0.0,
            total_removed,
            anomaly: None,
        }
    }

    pub fn ticket(site: &str, d: &str, volume: f64) -> TransportTicket {
        TransportTicket::new(site, date(d), volume)
    }
}

// ── Ticket intake ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod intake {
    use super::helpers::date;
    use crate::{TicketBook, TicketRecord, TicketRejectReason};
    use cw_core::SiteId;

    #[test]
    fn valid_record_carries_ids() {
        let t = TicketRecord::new("Cauldron_001", "2024-01-05", 300.0)
            .with_ticket_id("TT_1")
            .with_courier("Courier_01")
            .validate()
            .unwrap();
        assert_eq!(t.site.as_str(), "cauldron_001");
        assert_eq!(t.date, date("2024-01-05"));
        assert_eq!(t.ticket_id.as_deref(), Some("TT_1"));
        assert_eq!(t.courier_id.unwrap().as_str(), "courier_01");
    }

    #[test]
    fn timestamp_date_uses_calendar_part() {
        let t = TicketRecord::new("c1", "2024-01-05T23:30:00-05:00", 1.0).validate().unwrap();
        assert_eq!(t.date, date("2024-01-05"));
    }

    #[test]
    fn bad_records_rejected_individually() {
        let mut book = TicketBook::new([SiteId::new("c1")]);
        let rejected = book.add_batch([
            TicketRecord::new("c1", "2024-01-05", 10.0),
            TicketRecord::new("c1", "05/01/2024", 10.0),
            TicketRecord::new("c1", "2024-01-05", -1.0),
            TicketRecord::new("ghost", "2024-01-05", 10.0),
            TicketRecord::default(),
            TicketRecord::new("C1", "2024-01-06", 20.0),
        ]);
        assert_eq!(book.len(), 2);
        let idx: Vec<usize> = rejected.iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![1, 2, 3, 4]);
        assert!(matches!(rejected[0].reason, TicketRejectReason::BadDate(_)));
        assert_eq!(rejected[1].reason, TicketRejectReason::InvalidVolume(-1.0));
        assert_eq!(rejected[2].reason, TicketRejectReason::UnknownReservoir(SiteId::new("ghost")));
        assert_eq!(rejected[3].reason, TicketRejectReason::MissingField("reservoir_id"));
    }
}

// ── Classification ────────────────────────────────────────────────────────────

#[cfg(test)]
mod classification {
    use cw_core::Tolerance;

    use crate::{classify, Classification};

    #[test]
    fn boundary_is_matched_one_unit_beyond_flips() {
        let tol = Tolerance::Absolute(10.0);
        assert_eq!(classify(510.0, 520.0, tol), Classification::Matched);
        assert_eq!(classify(509.0, 520.0, tol), Classification::UnderReported);
        assert_eq!(classify(530.0, 520.0, tol), Classification::Matched);
        assert_eq!(classify(531.0, 520.0, tol), Classification::OverReported);
    }

    #[test]
    fn relative_band_scales_with_computed() {
        let tol = Tolerance::Relative(0.05);
        assert_eq!(classify(950.0, 1_000.0, tol), Classification::Matched);
        assert_eq!(classify(940.0, 1_000.0, tol), Classification::UnderReported);
        assert_eq!(classify(1_060.0, 1_000.0, tol), Classification::OverReported);
    }
}

// ── Reconciliation ────────────────────────────────────────────────────────────

#[cfg(test)]
mod reconcile {
    use cw_core::{DayBoundary, ReconcileConfig, SiteId, Tolerance};

    use super::helpers::{date, event, ticket};
    use crate::{Classification, Severity, TicketReconciler, TransportTicket};

    fn reconciler() -> TicketReconciler {
        TicketReconciler::new(ReconcileConfig { tolerance: Tolerance::Absolute(10.0), ..Default::default() })
    }

    #[test]
    fn ticket_without_events_is_critical_under_report() {
        let report = reconciler().reconcile(
            &[ticket("c1", "2024-01-05", 300.0)],
            &[event("c1", "2024-01-04T12:00:00Z", 250.0)],
        );
        assert_eq!(report.discrepancies.len(), 1);
        let d = &report.discrepancies[0];
        assert_eq!(d.date, date("2024-01-05"));
        assert_eq!(d.classification, Classification::UnderReported);
        assert_eq!(d.severity, Severity::Critical);
        assert_eq!(d.computed, 0.0);
        assert_eq!(d.delta, -300.0);
        assert_eq!(report.critical().count(), 1);

        assert_eq!(report.unlogged.len(), 1);
        assert_eq!(report.unlogged[0].date, date("2024-01-04"));
        assert_eq!(report.unlogged[0].total_removed, 250.0);
    }

    #[test]
    fn same_day_events_and_tickets_are_summed() {
        let mut t2 = ticket("c1", "2024-01-05", 200.0);
        t2.ticket_id = Some("TT_2".into());
        let mut t1 = ticket("c1", "2024-01-05", 310.0);
        t1.ticket_id = Some("TT_1".into());
        let report = reconciler().reconcile(
            &[t2, t1],
            &[
                event("c1", "2024-01-05T08:00:00Z", 300.0),
                event("c1", "2024-01-05T17:00:00Z", 220.0),
            ],
        );
        let d = &report.discrepancies[0];
        assert_eq!(d.reported, 510.0);
        assert_eq!(d.computed, 520.0);
        assert_eq!(d.delta, 10.0);
        assert_eq!(d.classification, Classification::Matched);
        assert_eq!(d.severity, Severity::Info);
        assert_eq!(d.ticket_ids, vec!["TT_1".to_string(), "TT_2".to_string()]);
        assert_eq!((d.ticket_count, d.event_count), (2, 2));
        assert!(report.unlogged.is_empty());
    }

    #[test]
    fn over_and_under_reports() {
        let report = reconciler().reconcile(
            &[ticket("c1", "2024-01-05", 100.0), ticket("c2", "2024-01-05", 400.0)],
            &[event("c1", "2024-01-05T08:00:00Z", 300.0), event("c2", "2024-01-05T08:00:00Z", 300.0)],
        );
        let classes: Vec<_> = report.discrepancies.iter().map(|d| (d.site.as_str(), d.classification)).collect();
        assert_eq!(
            classes,
            vec![("c1", Classification::UnderReported), ("c2", Classification::OverReported)]
        );
        assert!(report.discrepancies.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn day_boundary_moves_late_events() {
        // 03:00Z on the 6th is 22:00 on the 5th at UTC-5.
        let events = [event("c1", "2024-01-06T03:00:00Z", 100.0)];
        let tickets = [ticket("c1", "2024-01-05", 100.0)];

        let utc = reconciler().reconcile(&tickets, &events);
        assert_eq!(utc.discrepancies[0].severity, Severity::Critical);
        assert_eq!(utc.unlogged[0].date, date("2024-01-06"));

        let local = TicketReconciler::new(ReconcileConfig {
            tolerance: Tolerance::Absolute(10.0),
            day_boundary: DayBoundary::new(-300, 0),
        })
        .reconcile(&tickets, &events);
        assert_eq!(local.discrepancies[0].classification, Classification::Matched);
        assert!(local.unlogged.is_empty());

        let per_site = reconciler()
            .with_site_boundary("c1", DayBoundary::new(-300, 0))
            .reconcile(&tickets, &events);
        assert_eq!(per_site, local);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let tickets: Vec<TransportTicket> = (1..=9)
            .map(|d| ticket(if d % 2 == 0 { "c1" } else { "c2" }, &format!("2024-01-0{d}"), 50.0 * d as f64))
            .collect();
        let events: Vec<_> = (1..=9)
            .map(|d| event(if d % 3 == 0 { "c2" } else { "c1" }, &format!("2024-01-0{d}T10:00:00Z"), 47.5 * d as f64))
            .collect();
        let r = reconciler();
        let first = r.reconcile(&tickets, &events);
        let second = r.reconcile(&tickets, &events);
        assert_eq!(first, second);
        assert!(!first.discrepancies.is_empty());
    }

    #[test]
    fn output_is_sorted_by_site_then_date() {
        let report = reconciler().reconcile(
            &[
                ticket("c2", "2024-01-02", 1.0),
                ticket("c1", "2024-01-03", 1.0),
                ticket("c1", "2024-01-01", 1.0),
            ],
            &[],
        );
        let keys: Vec<_> = report
            .discrepancies
            .iter()
            .map(|d| (d.site.clone(), d.date))
            .collect();
        assert_eq!(
            keys,
            vec![
                (SiteId::new("c1"), date("2024-01-01")),
                (SiteId::new("c1"), date("2024-01-03")),
                (SiteId::new("c2"), date("2024-01-02")),
            ]
        );
    }
}

// ── CSV loader ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use crate::load_tickets_reader;

    #[test]
    fn aliases_and_optional_columns() {
        let csv = "\
cauldron_id,date,amount_collected,ticket_id,courier_id
c1,2024-01-05,300.0,TT_1,courier_01
c2,2024-01-05,120.5,,
";
        let records = load_tickets_reader(Cursor::new(csv)).unwrap();
        assert_eq!(records.len(), 2);
        let t = records[0].validate().unwrap();
        assert_eq!(t.volume, 300.0);
        assert_eq!(t.ticket_id.as_deref(), Some("TT_1"));
        let t = records[1].validate().unwrap();
        assert_eq!(t.ticket_id, None);
        assert_eq!(t.courier_id, None);
    }

    #[test]
    fn missing_date_column_is_an_error() {
        assert!(load_tickets_reader(Cursor::new("reservoir_id,volume\nc1,1\n")).is_err());
    }
}
