//! Drain-event detection.
//!
//! # State machine
//!
//! One `DrainDetector` per reservoir consumes readings in time order:
//!
//! ```text
//!            Δ < -ε                         Δ ≥ -ε  or gap
//!  FILLING ──────────► DRAINING ────────────────────────► FILLING
//!     ▲                  │  Δ < -ε: extend run              (run closes)
//!     └──────────────────┘
//! ```
//!
//! `Δ` is the level change between consecutive readings and `ε` the noise
//! threshold.  A run starts at the reading *before* the first falling delta
//! and ends at the last falling reading.
//!
//! # Closing runs
//!
//! A closed run is held back as *pending* until no later run can merge with
//! it: two runs whose separation is under `merge_gap_minutes` are the same
//! courier visit.  A gap wider than `gap_threshold_minutes` flushes both the
//! open and the pending run, so no event ever spans a gap.
//!
//! # Volume reconstruction
//!
//! Inflow continues while a reservoir is drained, so the raw level drop
//! under-counts what was taken:
//!
//! ```text
//! total_removed = (level_at_start − level_at_end) + fill_rate × duration
//! ```
//!
//! When the level ends *above* where it started, the total is floored at the
//! inflow estimate and the event is flagged [`DrainAnomaly::LevelRose`].
//! A total that would still come out negative is clamped to zero and flagged
//! [`DrainAnomaly::Clamped`].

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use cw_core::{minutes_between, DetectorConfig, SiteId};

use crate::{LevelSeries, Reading};

// ── DrainEvent ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrainAnomaly {
    /// The level ended higher than it started; total floored at inflow.
    LevelRose,
    /// The reconstructed total came out negative and was clamped to zero.
    Clamped,
}

/// A reconstructed interval of active removal.  Immutable once emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct DrainEvent {
    pub site: SiteId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub level_at_start: f64,
    pub level_at_end: f64,
    /// Inflow hidden by the drain, `fill_rate × duration`.
    pub inferred_fill: f64,
    pub total_removed: f64,
    pub anomaly: Option<DrainAnomaly>,
}

impl DrainEvent {
    fn from_run(site: &SiteId, run: &Run, fill_rate: f64) -> Self {
        let duration = minutes_between(run.start.at, run.end.at);
        let inferred_fill = fill_rate * duration;
        let raw = run.start.volume - run.end.volume + inferred_fill;
        let (total_removed, anomaly) = if run.end.volume > run.start.volume {
            (inferred_fill, Some(DrainAnomaly::LevelRose))
        } else if raw < 0.0 || !raw.is_finite() {
            warn!(site = %site, start = %run.start.at, raw, "negative drain total clamped to zero");
            (0.0, Some(DrainAnomaly::Clamped))
        } else {
            (raw, None)
        };
        Self {
            site: site.clone(),
            start: run.start.at,
            end: run.end.at,
            level_at_start: run.start.volume,
            level_at_end: run.end.volume,
            inferred_fill,
            total_removed: total_removed.max(0.0),
            anomaly,
        }
    }

    pub fn duration_minutes(&self) -> f64 {
        minutes_between(self.start, self.end)
    }
}

// ── DrainDetector ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum DetectorState {
    #[default]
    Filling,
    Draining,
}

#[derive(Copy, Clone, Debug)]
struct Run {
    start: Reading,
    end: Reading,
}

/// Incremental per-reservoir detector.  Owned by exactly one writer.
#[derive(Clone, Debug)]
pub struct DrainDetector {
    site: SiteId,
    fill_rate: f64,
    cfg: DetectorConfig,
    state: DetectorState,
    last: Option<Reading>,
    open: Option<Run>,
    pending: Option<Run>,
}

impl DrainDetector {
    /// `fill_rate` is volume/minute; pass `0.0` if unknown.
    pub fn new(site: impl Into<SiteId>, fill_rate: f64, cfg: DetectorConfig) -> Self {
        Self {
            site: site.into(),
            fill_rate: fill_rate.max(0.0),
            cfg,
            state: DetectorState::Filling,
            last: None,
            open: None,
            pending: None,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    /// Feed the next reading.  Returns the events that became final.
    ///
    /// Readings at or before the previous one are ignored; ordering is the
    /// caller's responsibility (the store reprocesses on backfill).
    pub fn push(&mut self, reading: Reading) -> Vec<DrainEvent> {
        let mut out = Vec::new();
        let Some(prev) = self.last else {
            self.last = Some(reading);
            return out;
        };

        let dt = minutes_between(prev.at, reading.at);
        if dt <= 0.0 {
            trace!(site = %self.site, at = %reading.at, "out-of-order reading ignored by detector");
            return out;
        }
        self.last = Some(reading);

        if dt > self.cfg.gap_threshold_minutes {
            debug!(site = %self.site, gap_minutes = dt, "gap: closing runs at segment boundary");
            self.close_open();
            self.emit_pending(&mut out);
            self.state = DetectorState::Filling;
            return out;
        }

        // A step counts as falling on the raw delta alone.  Expected inflow is
        // not subtracted here; it only enters when the event total is computed.
        let falling = reading.volume - prev.volume < -self.cfg.noise_epsilon;
        match (self.state, falling) {
            (DetectorState::Filling, true) => {
                let start = match self.pending.take() {
                    Some(p) if minutes_between(p.end.at, prev.at) < self.cfg.merge_gap_minutes => {
                        debug!(site = %self.site, "merging drain runs across short pause");
                        p.start
                    }
                    Some(p) => {
                        out.push(self.event(&p));
                        prev
                    }
                    None => prev,
                };
                self.open = Some(Run { start, end: reading });
                self.state = DetectorState::Draining;
                trace!(site = %self.site, at = %prev.at, "FILLING -> DRAINING");
            }
            (DetectorState::Draining, true) => {
                if let Some(run) = self.open.as_mut() {
                    run.end = reading;
                }
            }
            (DetectorState::Draining, false) => {
                self.close_open();
                self.state = DetectorState::Filling;
                trace!(site = %self.site, at = %prev.at, "DRAINING -> FILLING");
                self.expire_pending(reading, &mut out);
            }
            (DetectorState::Filling, false) => self.expire_pending(reading, &mut out),
        }
        out
    }

    /// Close any open run and emit everything still held back.  Used at the
    /// end of a batch; the detector stays usable afterwards.
    pub fn finish(&mut self) -> Vec<DrainEvent> {
        let mut out = Vec::new();
        self.close_open();
        self.emit_pending(&mut out);
        self.state = DetectorState::Filling;
        out
    }

    /// Events that would be emitted if the stream ended now, without
    /// mutating the detector.
    pub fn peek_unfinished(&self) -> Vec<DrainEvent> {
        self.clone().finish()
    }

    fn close_open(&mut self) {
        if let Some(run) = self.open.take() {
            debug_assert!(self.pending.is_none(), "pending run is merged into or emitted before a new run opens");
            self.pending = Some(run);
        }
    }

    /// Emit the pending run once no future run can start within the merge gap.
    fn expire_pending(&mut self, now: Reading, out: &mut Vec<DrainEvent>) {
        if let Some(p) = self.pending {
            if minutes_between(p.end.at, now.at) >= self.cfg.merge_gap_minutes {
                self.pending = None;
                out.push(self.event(&p));
            }
        }
    }

    fn emit_pending(&mut self, out: &mut Vec<DrainEvent>) {
        if let Some(p) = self.pending.take() {
            out.push(self.event(&p));
        }
    }

    fn event(&self, run: &Run) -> DrainEvent {
        let event = DrainEvent::from_run(&self.site, run, self.fill_rate);
        debug!(
            site = %event.site,
            start = %event.start,
            end = %event.end,
            total_removed = event.total_removed,
            "drain event",
        );
        event
    }
}

/// Batch detection over a whole series.
pub fn detect(series: &LevelSeries, fill_rate: f64, cfg: &DetectorConfig) -> Vec<DrainEvent> {
    let mut detector = DrainDetector::new(series.site().clone(), fill_rate, cfg.clone());
    let mut events = Vec::new();
    for r in series.readings() {
        events.extend(detector.push(*r));
    }
    events.extend(detector.finish());
    events
}
