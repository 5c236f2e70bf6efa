//! Deterministic synthetic telemetry.
//!
//! Produces minute-resolution readings for one reservoir: inflow at
//! `fill_rate` scaled by a multiplicative noise factor drawn uniformly from
//! `[1 - noise, 1 + noise]` each minute, minus any injected drains.  The
//! same seed always produces the same series.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use cw_core::SiteId;

use crate::{Reading, TelemetryRecord};

/// A courier visit: gross extraction of `removal_per_minute` for
/// `duration_minutes` starting at minute `start_minute`.
///
/// Inflow continues during the visit, so the ground-truth volume taken is
/// `removal_per_minute × duration_minutes`, while the level only falls by
/// that minus the inflow.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InjectedDrain {
    pub start_minute: u32,
    pub duration_minutes: u32,
    pub removal_per_minute: f64,
}

impl InjectedDrain {
    pub fn removed(&self) -> f64 {
        self.removal_per_minute * self.duration_minutes as f64
    }

    fn active_at(&self, minute: u32) -> bool {
        minute > self.start_minute && minute <= self.start_minute + self.duration_minutes
    }
}

#[derive(Clone, Debug)]
pub struct SyntheticSeries {
    pub start: DateTime<Utc>,
    pub minutes: u32,
    pub initial_level: f64,
    pub fill_rate: f64,
    /// Half-width of the multiplicative noise band (0.02 → 0.98..1.02).
    pub noise: f64,
    pub max_volume: Option<f64>,
    pub drains: Vec<InjectedDrain>,
    pub seed: u64,
}

impl SyntheticSeries {
    pub fn new(start: DateTime<Utc>, minutes: u32, initial_level: f64, fill_rate: f64) -> Self {
        Self {
            start,
            minutes,
            initial_level,
            fill_rate,
            noise: 0.0,
            max_volume: None,
            drains: Vec::new(),
            seed: 0,
        }
    }

    pub fn with_noise(mut self, noise: f64, seed: u64) -> Self {
        self.noise = noise;
        self.seed = seed;
        self
    }

    pub fn with_max_volume(mut self, max: f64) -> Self {
        self.max_volume = Some(max);
        self
    }

    pub fn with_drain(mut self, drain: InjectedDrain) -> Self {
        self.drains.push(drain);
        self
    }

    /// Readings at minutes `0..=minutes`.
    pub fn generate(&self) -> Vec<Reading> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut level = self.initial_level;
        let mut out = Vec::with_capacity(self.minutes as usize + 1);
        out.push(Reading::new(self.start, level));

        for minute in 1..=self.minutes {
            let factor = if self.noise > 0.0 {
                rng.gen_range(1.0 - self.noise..=1.0 + self.noise)
            } else {
                1.0
            };
            level += self.fill_rate * factor;
            for d in self.drains.iter().filter(|d| d.active_at(minute)) {
                level -= d.removal_per_minute;
            }
            level = level.max(0.0);
            if let Some(max) = self.max_volume {
                level = level.min(max);
            }
            out.push(Reading::new(self.start + Duration::minutes(minute as i64), level));
        }
        out
    }

    /// The series as raw records for `site`, RFC 3339 timestamps.
    pub fn records(&self, site: &SiteId) -> Vec<TelemetryRecord> {
        self.generate()
            .into_iter()
            .map(|r| TelemetryRecord::new(site.as_str(), &r.at.to_rfc3339(), r.volume))
            .collect()
    }
}
