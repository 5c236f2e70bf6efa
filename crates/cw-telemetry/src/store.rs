//! `TelemetryStore`: the single coordinator of per-reservoir state.
//!
//! # Ownership model
//!
//! Every reservoir owns one `Channel`: its `LevelSeries`, its
//! `DrainDetector`, and the events that detector has finalised.  Channels
//! are only reachable through `&mut TelemetryStore`, so each reservoir has
//! exactly one writer at a time.  Batch ingestion may process different
//! reservoirs concurrently (`parallel` feature) because each Rayon task
//! borrows a distinct channel mutably.
//!
//! # Incremental vs. reprocessed
//!
//! In-order appends go straight through the detector.  A backfilled or
//! replaced reading invalidates the detector's history for that reservoir;
//! the channel is marked stale and its events are recomputed from the
//! series on the next [`refresh`](TelemetryStore::refresh).  Recomputed
//! events supersede the old ones wholesale.
//!
//! Reservoirs without a configured fill rate use the estimate from
//! [`estimate_rates`]; a changed estimate also marks the channel stale.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use cw_core::{DetectorConfig, Reservoir, SiteId};

use crate::detector::{DrainDetector, DrainEvent};
use crate::rates::{estimate_rates, RateEstimate};
use crate::series::{InsertOutcome, LevelSeries};
use crate::{LevelSample, Reading, RejectReason, Rejection, TelemetryRecord};

/// Relative change in an estimated fill rate that triggers reprocessing.
const RATE_CHANGE_TOLERANCE: f64 = 0.01;

// ── Channel ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Channel {
    reservoir: Reservoir,
    series: LevelSeries,
    detector: DrainDetector,
    events: Vec<DrainEvent>,
    estimate: RateEstimate,
    stale: bool,
}

impl Channel {
    fn new(reservoir: Reservoir, cfg: &DetectorConfig) -> Self {
        let fill = reservoir.fill_rate.unwrap_or(0.0);
        Self {
            series: LevelSeries::new(reservoir.id.clone()),
            detector: DrainDetector::new(reservoir.id.clone(), fill, cfg.clone()),
            events: Vec::new(),
            estimate: RateEstimate::default(),
            stale: false,
            reservoir,
        }
    }

    fn fill_rate(&self) -> f64 {
        self.reservoir.fill_rate.or(self.estimate.fill_rate).unwrap_or(0.0)
    }

    /// Insert one reading; feed the detector only when it extends the series.
    fn accept(&mut self, reading: Reading) -> InsertOutcome {
        let outcome = self.series.insert(reading);
        match outcome {
            InsertOutcome::Appended if !self.stale => {
                let emitted = self.detector.push(reading);
                self.events.extend(emitted);
            }
            InsertOutcome::Appended => {}
            InsertOutcome::Replaced | InsertOutcome::Backfilled => {
                debug!(site = %self.reservoir.id, at = %reading.at, ?outcome, "history changed; channel stale");
                self.stale = true;
            }
        }
        outcome
    }

    fn refresh_estimate(&mut self, cfg: &DetectorConfig) {
        self.estimate = estimate_rates(&self.series, cfg);
        if self.reservoir.fill_rate.is_none() {
            let old = self.detector.fill_rate();
            let new = self.fill_rate();
            if (new - old).abs() > RATE_CHANGE_TOLERANCE * old.abs().max(f64::MIN_POSITIVE) {
                debug!(site = %self.reservoir.id, old, new, "fill-rate estimate changed; channel stale");
                self.stale = true;
            }
        }
    }

    fn reprocess(&mut self, cfg: &DetectorConfig) {
        let mut detector = DrainDetector::new(self.reservoir.id.clone(), self.fill_rate(), cfg.clone());
        let mut events = Vec::new();
        for r in self.series.readings() {
            events.extend(detector.push(*r));
        }
        debug!(site = %self.reservoir.id, superseded = self.events.len(), events = events.len(), "channel reprocessed");
        self.detector = detector;
        self.events = events;
        self.stale = false;
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// What a single [`TelemetryStore::ingest`] did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IngestOutcome {
    pub insert: InsertOutcome,
    /// Events finalised by this reading.
    pub new_events: usize,
}

/// Summary of a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    pub replaced: usize,
    pub backfilled: usize,
    pub rejected: Vec<Rejection>,
    /// Reservoirs whose events were recomputed.
    pub reprocessed: Vec<SiteId>,
}

// ── TelemetryStore ────────────────────────────────────────────────────────────

pub struct TelemetryStore {
    cfg: DetectorConfig,
    channels: BTreeMap<SiteId, Channel>,
}

impl TelemetryStore {
    /// Create a store with one channel per reservoir.  Invalid reservoirs
    /// are an error: they are static configuration, not stream records.
    pub fn new(reservoirs: impl IntoIterator<Item = Reservoir>, cfg: DetectorConfig) -> cw_core::CoreResult<Self> {
        let mut channels = BTreeMap::new();
        for r in reservoirs {
            r.validate()?;
            if channels.contains_key(&r.id) {
                return Err(cw_core::CoreError::DuplicateSite(r.id));
            }
            channels.insert(r.id.clone(), Channel::new(r, &cfg));
        }
        Ok(Self { cfg, channels })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    // ── Ingestion ─────────────────────────────────────────────────────────

    /// Validate and ingest one record.  Rejections are logged and returned;
    /// they never disturb other reservoirs.
    pub fn ingest(&mut self, record: &TelemetryRecord) -> Result<IngestOutcome, RejectReason> {
        let sample = record.validate().inspect_err(|reason| warn!(%reason, "telemetry record rejected"))?;
        self.ingest_sample(sample)
    }

    /// Ingest an already validated sample.
    pub fn ingest_sample(&mut self, sample: LevelSample) -> Result<IngestOutcome, RejectReason> {
        let Some(channel) = self.channels.get_mut(&sample.site) else {
            warn!(site = %sample.site, "telemetry for unknown reservoir rejected");
            return Err(RejectReason::UnknownReservoir(sample.site));
        };
        let before = channel.events.len();
        let insert = channel.accept(sample.reading());
        let new_events = channel.events.len().saturating_sub(before);
        Ok(IngestOutcome { insert, new_events })
    }

    /// Validate a batch, then process each reservoir's readings in time
    /// order, refresh rate estimates, and reprocess stale channels.
    pub fn ingest_batch(&mut self, records: impl IntoIterator<Item = TelemetryRecord>) -> IngestReport {
        let mut report = IngestReport::default();
        let mut by_site: HashMap<SiteId, Vec<Reading>> = HashMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let sample = match record.validate() {
                Ok(s) => s,
                Err(reason) => {
                    warn!(index, %reason, "telemetry record rejected");
                    report.rejected.push(Rejection { index, reason });
                    continue;
                }
            };
            if !self.channels.contains_key(&sample.site) {
                warn!(index, site = %sample.site, "telemetry for unknown reservoir rejected");
                report.rejected.push(Rejection { index, reason: RejectReason::UnknownReservoir(sample.site) });
                continue;
            }
            by_site.entry(sample.site.clone()).or_default().push(sample.reading());
        }

        // Stable sort: among equal instants the later record wins on insert.
        for readings in by_site.values_mut() {
            readings.sort_by_key(|r| r.at);
        }

        let outcomes = self.apply_grouped(by_site);
        for outcome in outcomes {
            report.accepted += 1;
            match outcome {
                InsertOutcome::Appended => {}
                InsertOutcome::Replaced => report.replaced += 1,
                InsertOutcome::Backfilled => report.backfilled += 1,
            }
        }

        report.reprocessed = self.refresh();
        info!(
            accepted = report.accepted,
            rejected = report.rejected.len(),
            reprocessed = report.reprocessed.len(),
            "telemetry batch ingested",
        );
        report
    }

    #[cfg(not(feature = "parallel"))]
    fn apply_grouped(&mut self, mut by_site: HashMap<SiteId, Vec<Reading>>) -> Vec<InsertOutcome> {
        let mut outcomes = Vec::new();
        for (site, channel) in self.channels.iter_mut() {
            if let Some(readings) = by_site.remove(site) {
                outcomes.extend(readings.into_iter().map(|r| channel.accept(r)));
            }
        }
        outcomes
    }

    #[cfg(feature = "parallel")]
    fn apply_grouped(&mut self, mut by_site: HashMap<SiteId, Vec<Reading>>) -> Vec<InsertOutcome> {
        use rayon::prelude::*;

        let mut work: Vec<(&mut Channel, Vec<Reading>)> = self
            .channels
            .iter_mut()
            .filter_map(|(site, ch)| by_site.remove(site).map(|rs| (ch, rs)))
            .collect();
        work.par_iter_mut()
            .flat_map_iter(|(channel, readings)| {
                readings.drain(..).map(|r| channel.accept(r)).collect::<Vec<_>>()
            })
            .collect()
    }

    /// Re-estimate rates and reprocess every stale channel.  Returns the
    /// reservoirs whose events were recomputed.
    pub fn refresh(&mut self) -> Vec<SiteId> {
        let cfg = self.cfg.clone();
        let mut reprocessed = Vec::new();
        for (site, channel) in self.channels.iter_mut() {
            channel.refresh_estimate(&cfg);
            if channel.stale {
                channel.reprocess(&cfg);
                reprocessed.push(site.clone());
            }
        }
        reprocessed
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn reservoirs(&self) -> impl Iterator<Item = &Reservoir> {
        self.channels.values().map(|c| &c.reservoir)
    }

    pub fn reservoir(&self, site: &SiteId) -> Option<&Reservoir> {
        self.channels.get(site).map(|c| &c.reservoir)
    }

    pub fn series(&self, site: &SiteId) -> Option<&LevelSeries> {
        self.channels.get(site).map(|c| &c.series)
    }

    pub fn latest(&self, site: &SiteId) -> Option<Reading> {
        self.channels.get(site).and_then(|c| c.series.latest().copied())
    }

    /// Finalised events of one reservoir.  Stale channels report what they
    /// had before the history changed until `refresh` runs.
    pub fn events(&self, site: &SiteId) -> &[DrainEvent] {
        self.channels.get(site).map(|c| c.events.as_slice()).unwrap_or(&[])
    }

    /// Every event as if all streams ended now: finalised events plus the
    /// open and pending runs closed at their last reading.  Sorted by
    /// reservoir then start.
    pub fn events_through_now(&self) -> Vec<DrainEvent> {
        let mut all = Vec::new();
        for channel in self.channels.values() {
            if channel.stale {
                let mut fresh = channel.clone();
                fresh.reprocess(&self.cfg);
                all.extend(fresh.events);
                all.extend(fresh.detector.peek_unfinished());
            } else {
                all.extend(channel.events.iter().cloned());
                all.extend(channel.detector.peek_unfinished());
            }
        }
        all
    }

    /// Configured fill rate, else the estimate.
    pub fn fill_rate(&self, site: &SiteId) -> Option<f64> {
        let c = self.channels.get(site)?;
        c.reservoir.fill_rate.or(c.estimate.fill_rate)
    }

    /// Configured drain rate, else the estimate.
    pub fn drain_rate(&self, site: &SiteId) -> Option<f64> {
        let c = self.channels.get(site)?;
        c.reservoir.drain_rate.or(c.estimate.drain_rate)
    }

    pub fn estimate(&self, site: &SiteId) -> Option<RateEstimate> {
        self.channels.get(site).map(|c| c.estimate)
    }
}
