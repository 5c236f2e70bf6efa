//! Unit tests for cw-telemetry.

#[cfg(test)]
mod helpers {
    use chrono::{DateTime, Duration, Utc};

    use cw_core::{GeoPoint, Reservoir};

    use crate::{InjectedDrain, Reading, SyntheticSeries};

    pub fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-05T08:00:00Z").unwrap().with_timezone(&Utc)
    }

    pub fn at_min(m: i64) -> DateTime<Utc> {
        t0() + Duration::minutes(m)
    }

    pub fn reading(m: i64, v: f64) -> Reading {
        Reading::new(at_min(m), v)
    }

    /// Fill 2/min for 60 min from 1000, then a 10-minute visit removing
    /// 52/min gross (level falls 50/min), then fill resumes to minute 90.
    pub fn known_drain() -> SyntheticSeries {
        SyntheticSeries::new(t0(), 90, 1_000.0, 2.0).with_drain(InjectedDrain {
            start_minute: 60,
            duration_minutes: 10,
            removal_per_minute: 52.0,
        })
    }

    pub fn reservoir(id: &str) -> Reservoir {
        Reservoir::new(id, id, GeoPoint::new(0.0, 0.0), 5_000.0).with_fill_rate(2.0)
    }
}

// ── Sample validation ─────────────────────────────────────────────────────────

#[cfg(test)]
mod sample {
    use crate::{RejectReason, TelemetryRecord};

    #[test]
    fn valid_record_normalises_to_utc() {
        let s = TelemetryRecord::new("Cauldron_001", "2024-01-05T10:00:00+02:00", 12.5)
            .validate()
            .unwrap();
        assert_eq!(s.site.as_str(), "cauldron_001");
        assert_eq!(s.at.to_rfc3339(), "2024-01-05T08:00:00+00:00");
        assert_eq!(s.volume, 12.5);
    }

    #[test]
    fn missing_fields() {
        let mut r = TelemetryRecord::new("c1", "2024-01-05T10:00:00Z", 1.0);
        r.volume = None;
        assert_eq!(r.validate(), Err(RejectReason::MissingField("volume")));

        let r = TelemetryRecord::default();
        assert_eq!(r.validate(), Err(RejectReason::MissingField("reservoir_id")));

        let mut r = TelemetryRecord::new("c1", "  ", 1.0);
        r.timestamp = Some("  ".into());
        assert_eq!(r.validate(), Err(RejectReason::MissingField("timestamp")));
    }

    #[test]
    fn naive_timestamp_and_negative_volume_rejected() {
        let r = TelemetryRecord::new("c1", "2024-01-05 10:00:00", 1.0);
        assert!(matches!(r.validate(), Err(RejectReason::BadTimestamp(_))));

        let r = TelemetryRecord::new("c1", "2024-01-05T10:00:00Z", -3.0);
        assert_eq!(r.validate(), Err(RejectReason::InvalidVolume(-3.0)));
    }
}

// ── LevelSeries ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod series {
    use super::helpers::reading;
    use crate::{InsertOutcome, LevelSeries};

    #[test]
    fn out_of_order_inserts_are_sorted() {
        let mut s = LevelSeries::new("c1");
        assert_eq!(s.insert(reading(0, 1.0)), InsertOutcome::Appended);
        assert_eq!(s.insert(reading(2, 3.0)), InsertOutcome::Appended);
        assert_eq!(s.insert(reading(1, 2.0)), InsertOutcome::Backfilled);
        let vols: Vec<f64> = s.readings().iter().map(|r| r.volume).collect();
        assert_eq!(vols, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn duplicate_timestamp_keeps_later_value() {
        let mut s = LevelSeries::new("c1");
        s.insert(reading(0, 1.0));
        s.insert(reading(1, 2.0));
        assert_eq!(s.insert(reading(1, 9.0)), InsertOutcome::Replaced);
        assert_eq!(s.len(), 2);
        assert_eq!(s.latest().unwrap().volume, 9.0);
    }

    #[test]
    fn gaps_split_segments() {
        let s = LevelSeries::from_readings(
            "c1",
            [0, 1, 2, 9, 10, 20].map(|m| reading(m, m as f64)),
        );
        let lens: Vec<usize> = s.segments(5.0).iter().map(|seg| seg.len()).collect();
        assert_eq!(lens, vec![3, 2, 1]);
        // A gap of exactly the threshold does not split.
        let s = LevelSeries::from_readings("c1", [0, 5].map(|m| reading(m, 0.0)));
        assert_eq!(s.segments(5.0).len(), 1);
    }
}

// ── Rate estimation ───────────────────────────────────────────────────────────

#[cfg(test)]
mod rates {
    use cw_core::DetectorConfig;

    use super::helpers::{known_drain, reading};
    use crate::{estimate_rates, LevelSeries};

    #[test]
    fn fill_and_drain_rates_from_known_series() {
        let s = LevelSeries::from_readings("c1", known_drain().generate());
        let est = estimate_rates(&s, &DetectorConfig::default());
        assert_eq!(est.fill_rate, Some(2.0));
        assert_eq!(est.drain_rate, Some(50.0));
    }

    #[test]
    fn single_spike_does_not_move_the_median() {
        let mut readings: Vec<_> = (0..30).map(|m| reading(m, 100.0 + 3.0 * m as f64)).collect();
        readings[15].volume += 80.0;
        let s = LevelSeries::from_readings("c1", readings);
        let est = estimate_rates(&s, &DetectorConfig::default());
        let fill = est.fill_rate.unwrap();
        assert!((fill - 3.0).abs() < 1e-9, "fill {fill}");
    }

    #[test]
    fn no_windows_no_rates() {
        let s = LevelSeries::from_readings("c1", [reading(0, 1.0)]);
        let est = estimate_rates(&s, &DetectorConfig::default());
        assert_eq!(est.fill_rate, None);
        assert_eq!(est.drain_rate, None);
    }
}

// ── Drain detection ───────────────────────────────────────────────────────────

#[cfg(test)]
mod detector {
    use cw_core::DetectorConfig;

    use super::helpers::{at_min, known_drain, reading};
    use crate::{
        detect, DetectorState, DrainAnomaly, DrainDetector, InjectedDrain, LevelSeries,
        SyntheticSeries,
    };

    fn cfg() -> DetectorConfig {
        DetectorConfig::default()
    }

    #[test]
    fn known_drain_reconstructs_removed_volume() {
        let s = LevelSeries::from_readings("c1", known_drain().generate());
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.start, at_min(60));
        assert_eq!(e.end, at_min(70));
        assert!((e.level_at_start - e.level_at_end - 500.0).abs() < 1e-9);
        assert!((e.inferred_fill - 20.0).abs() < 1e-9);
        assert!((e.total_removed - 520.0).abs() < 1e-9);
        assert_eq!(e.anomaly, None);
    }

    #[test]
    fn noisy_series_still_within_epsilon() {
        let series = known_drain().with_noise(0.02, 7);
        let s = LevelSeries::from_readings("c1", series.generate());
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        assert!((events[0].total_removed - 520.0).abs() < 1.0, "got {}", events[0].total_removed);
    }

    #[test]
    fn totals_never_below_raw_drop_or_zero() {
        let series = SyntheticSeries::new(super::helpers::t0(), 600, 200.0, 1.5)
            .with_noise(0.02, 99)
            .with_drain(InjectedDrain { start_minute: 100, duration_minutes: 8, removal_per_minute: 20.0 })
            .with_drain(InjectedDrain { start_minute: 300, duration_minutes: 3, removal_per_minute: 40.0 })
            .with_drain(InjectedDrain { start_minute: 500, duration_minutes: 12, removal_per_minute: 10.0 });
        let s = LevelSeries::from_readings("c1", series.generate());
        let events = detect(&s, 1.5, &cfg());
        assert_eq!(events.len(), 3);
        for e in &events {
            assert!(e.total_removed >= 0.0);
            assert!(e.total_removed >= e.level_at_start - e.level_at_end);
            assert!(e.end > e.start);
        }
    }

    #[test]
    fn short_pause_merges_runs() {
        // Drain 0→3, one rising sample at 4, drain again 4→6.
        let levels = [500.0, 450.0, 400.0, 350.0, 352.0, 300.0, 250.0, 252.0, 254.0, 256.0];
        let s = LevelSeries::from_readings("c1", levels.iter().enumerate().map(|(m, v)| reading(m as i64, *v)));
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, at_min(0));
        assert_eq!(events[0].end, at_min(6));
        assert!((events[0].total_removed - (250.0 + 12.0)).abs() < 1e-9);
    }

    #[test]
    fn long_pause_keeps_runs_apart() {
        let levels = [500.0, 450.0, 452.0, 454.0, 456.0, 400.0, 402.0, 404.0];
        let s = LevelSeries::from_readings("c1", levels.iter().enumerate().map(|(m, v)| reading(m as i64, *v)));
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn gap_closes_event_at_last_sample_before_gap() {
        let s = LevelSeries::from_readings(
            "c1",
            [reading(0, 500.0), reading(1, 450.0), reading(2, 400.0), reading(30, 100.0), reading(31, 102.0)],
        );
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].end, at_min(2));
        assert!((events[0].total_removed - 104.0).abs() < 1e-9);
    }

    #[test]
    fn rising_merged_run_is_floored_at_inflow() {
        // Two drains merged across a refill that overshoots the start.
        let levels = [100.0, 90.0, 150.0, 140.0, 142.0, 144.0, 146.0];
        let s = LevelSeries::from_readings("c1", levels.iter().enumerate().map(|(m, v)| reading(m as i64, *v)));
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.anomaly, Some(DrainAnomaly::LevelRose));
        assert!(e.level_at_end > e.level_at_start);
        assert!((e.total_removed - e.inferred_fill).abs() < 1e-9);
    }

    #[test]
    fn incremental_matches_batch_and_holds_back_pending() {
        let readings = known_drain().generate();
        let mut det = DrainDetector::new("c1", 2.0, cfg());
        let mut emitted = Vec::new();
        for r in &readings[..=71] {
            emitted.extend(det.push(*r));
        }
        // Run closed at minute 70 but still within the merge window.
        assert!(emitted.is_empty());
        assert_eq!(det.state(), DetectorState::Filling);
        assert_eq!(det.peek_unfinished().len(), 1);

        for r in &readings[72..] {
            emitted.extend(det.push(*r));
        }
        emitted.extend(det.finish());

        let batch = detect(&LevelSeries::from_readings("c1", readings), 2.0, &cfg());
        assert_eq!(emitted, batch);
    }

    #[test]
    fn noise_below_epsilon_is_not_a_drain() {
        let levels = [100.0, 100.3, 100.1, 100.4, 100.2, 100.5];
        let s = LevelSeries::from_readings("c1", levels.iter().enumerate().map(|(m, v)| reading(m as i64, *v)));
        assert!(detect(&s, 0.1, &cfg()).is_empty());
    }

    #[test]
    fn falling_step_is_judged_on_raw_delta() {
        // Fill 2/min.  The flat stretch at the end sits 2/min below the
        // expected level but does not fall, so it is not a drain.
        let levels = [100.0, 102.0, 104.0, 106.0, 105.0, 104.0, 103.0, 105.0, 107.0, 107.0, 107.0, 107.0];
        let s = LevelSeries::from_readings("c1", levels.iter().enumerate().map(|(m, v)| reading(m as i64, *v)));
        let events = detect(&s, 2.0, &cfg());
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start, events[0].end), (at_min(3), at_min(6)));
        assert!((events[0].total_removed - 9.0).abs() < 1e-9);
    }
}

// ── TelemetryStore ────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use cw_core::{DetectorConfig, SiteId};

    use super::helpers::{known_drain, reservoir};
    use crate::{InsertOutcome, RejectReason, TelemetryRecord, TelemetryStore};

    fn store() -> TelemetryStore {
        TelemetryStore::new([reservoir("c1"), reservoir("c2")], DetectorConfig::default()).unwrap()
    }

    #[test]
    fn batch_ingest_rejects_bad_records_and_continues() {
        let mut st = store();
        let c1 = SiteId::new("c1");
        let mut records = known_drain().records(&c1);
        records.insert(5, TelemetryRecord::new("ghost", "2024-01-05T08:03:00Z", 1.0));
        records.insert(6, TelemetryRecord::default());

        let report = st.ingest_batch(records);
        assert_eq!(report.accepted, 91);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].index, 5);
        assert!(matches!(report.rejected[0].reason, RejectReason::UnknownReservoir(_)));

        let events = st.events_through_now();
        assert_eq!(events.len(), 1);
        assert!((events[0].total_removed - 520.0).abs() < 1e-9);
        assert_eq!(st.latest(&c1).unwrap().volume, 620.0 + 40.0);
    }

    #[test]
    fn streaming_append_finalises_events_incrementally() {
        let mut st = store();
        let c1 = SiteId::new("c1");
        let mut finalised = 0;
        for r in known_drain().records(&c1) {
            finalised += st.ingest(&r).unwrap().new_events;
        }
        assert_eq!(finalised, 1);
        assert_eq!(st.events(&c1).len(), 1);
    }

    #[test]
    fn backfill_triggers_reprocessing() {
        let mut st = store();
        let c2 = SiteId::new("c2");
        let mut records = known_drain().records(&c2);
        // Hold back the drain's first falling sample and deliver it last.
        let late = records.remove(61);
        st.ingest_batch(records);
        let outcome = st.ingest(&late).unwrap();
        assert_eq!(outcome.insert, InsertOutcome::Backfilled);

        let reprocessed = st.refresh();
        assert_eq!(reprocessed, vec![c2.clone()]);
        let events = st.events_through_now();
        assert_eq!(events.len(), 1);
        assert!((events[0].total_removed - 520.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_fill_rate_is_estimated() {
        let mut r = reservoir("c3");
        r.fill_rate = None;
        let mut st = TelemetryStore::new([r], DetectorConfig::default()).unwrap();
        let c3 = SiteId::new("c3");
        st.ingest_batch(known_drain().records(&c3));
        assert_eq!(st.fill_rate(&c3), Some(2.0));
        assert_eq!(st.drain_rate(&c3), Some(50.0));
        let events = st.events_through_now();
        assert_eq!(events.len(), 1);
        assert!((events[0].total_removed - 520.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_reservoir_is_config_error() {
        assert!(TelemetryStore::new([reservoir("c1"), reservoir("C1")], DetectorConfig::default()).is_err());
    }
}

// ── CSV loader ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use crate::load_samples_reader;

    #[test]
    fn loads_rows_and_keeps_bad_ones_for_rejection() {
        let csv = "\
cauldron_id,timestamp,level
c1,2024-01-05T08:00:00Z,10.0
c1,2024-01-05T08:01:00Z,not-a-number
c1,2024-01-05T08:02:00Z,
";
        let records = load_samples_reader(Cursor::new(csv)).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].validate().is_ok());
        assert!(records[1].validate().is_err());
        assert!(records[2].validate().is_err());
    }

    #[test]
    fn missing_timestamp_column_is_an_error() {
        assert!(load_samples_reader(Cursor::new("reservoir_id,volume\nc1,1.0\n")).is_err());
    }
}
