//! Engine configuration.
//!
//! Typically loaded from a JSON file by the application crate (with the
//! `serde` feature every section is `#[serde(default)]`, so a partial file
//! only overrides what it names) and passed to each component.

use crate::{CoreError, CoreResult, DayBoundary};

// ── Tolerance ─────────────────────────────────────────────────────────────────

/// How far a reported volume may stray from the computed one and still match.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "snake_case"))]
pub enum Tolerance {
    /// Fixed volume band.
    Absolute(f64),
    /// Fraction of the computed volume (0.05 = 5 %).
    Relative(f64),
}

impl Tolerance {
    /// The absolute band for a given computed volume.
    #[inline]
    pub fn band(self, computed: f64) -> f64 {
        match self {
            Tolerance::Absolute(v) => v,
            Tolerance::Relative(f) => f * computed.abs(),
        }
    }

    fn value(self) -> f64 {
        match self {
            Tolerance::Absolute(v) | Tolerance::Relative(v) => v,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Relative(0.05)
    }
}

// ── DetectorConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DetectorConfig {
    /// Sample spacing (minutes) above which the series is split.
    pub gap_threshold_minutes: f64,
    /// Level deltas within ±epsilon are sensor noise.
    pub noise_epsilon: f64,
    /// Drain runs separated by less than this (minutes) are one visit.
    pub merge_gap_minutes: f64,
    /// Samples per rolling window for rate estimation.
    pub rate_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            gap_threshold_minutes: 5.0,
            noise_epsilon: 0.5,
            merge_gap_minutes: 2.0,
            rate_window: 5,
        }
    }
}

// ── ReconcileConfig ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReconcileConfig {
    pub tolerance: Tolerance,
    pub day_boundary: DayBoundary,
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Largest fleet tried before reporting "no feasible schedule".
    pub max_fleet: usize,
    /// Simulated span in minutes from the snapshot instant.
    pub horizon_minutes: f64,
    /// Overrides the depot's own unload duration, paid once per depot
    /// arrival.  `None` uses the depot's.
    pub unload_minutes: Option<f64>,
    /// Route over declared edge directions only instead of the undirected view.
    pub directed: bool,
    /// Minutes an idle courier waits before re-evaluating.
    pub idle_minutes: f64,
    /// Carrying capacity for couriers that do not declare their own.
    /// `None` means every collection is followed by an unload.
    pub courier_capacity: Option<f64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_fleet: 16,
            horizon_minutes: 1_440.0,
            unload_minutes: None,
            directed: false,
            idle_minutes: 5.0,
            courier_capacity: None,
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Top-level configuration grouping every component's section.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub reconcile: ReconcileConfig,
    pub scheduler: SchedulerConfig,
}

impl EngineConfig {
    /// Reject values no component can work with.
    pub fn validate(&self) -> CoreResult<()> {
        let d = &self.detector;
        non_negative("detector.gap_threshold_minutes", d.gap_threshold_minutes)?;
        non_negative("detector.noise_epsilon", d.noise_epsilon)?;
        non_negative("detector.merge_gap_minutes", d.merge_gap_minutes)?;
        if d.gap_threshold_minutes == 0.0 {
            return Err(CoreError::Config("detector.gap_threshold_minutes must be > 0".into()));
        }
        if d.rate_window < 2 {
            return Err(CoreError::Config("detector.rate_window must be >= 2".into()));
        }

        non_negative("reconcile.tolerance", self.reconcile.tolerance.value())?;
        if !self.reconcile.day_boundary.is_valid() {
            return Err(CoreError::Config(format!(
                "reconcile.day_boundary out of range: {:?}",
                self.reconcile.day_boundary
            )));
        }

        let s = &self.scheduler;
        if s.max_fleet == 0 {
            return Err(CoreError::Config("scheduler.max_fleet must be >= 1".into()));
        }
        if !(s.horizon_minutes.is_finite() && s.horizon_minutes > 0.0) {
            return Err(CoreError::Config("scheduler.horizon_minutes must be > 0".into()));
        }
        if let Some(m) = s.unload_minutes {
            non_negative("scheduler.unload_minutes", m)?;
        }
        if !(s.idle_minutes.is_finite() && s.idle_minutes > 0.0) {
            return Err(CoreError::Config("scheduler.idle_minutes must be > 0".into()));
        }
        if let Some(c) = s.courier_capacity {
            if !(c.is_finite() && c > 0.0) {
                return Err(CoreError::Config(format!("scheduler.courier_capacity must be > 0, got {c}")));
            }
        }
        Ok(())
    }
}

fn non_negative(name: &str, v: f64) -> CoreResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Config(format!("{name} must be a finite value >= 0, got {v}")))
    }
}
