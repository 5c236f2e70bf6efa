//! Level projection.
//!
//! Reservoirs fill linearly at their fill rate until they reach capacity.
//! The forecaster turns the latest observed level into the level at a later
//! instant and into a time-to-overflow, which is the scheduler's deadline.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use cw_core::minutes_between;
use cw_telemetry::TelemetryStore;

use crate::{LevelSnapshot, ReservoirState};

pub struct Forecaster;

impl Forecaster {
    /// Level after `minutes` of inflow, clamped to `[0, max_volume]`.
    #[inline]
    pub fn project(level: f64, fill_rate: f64, max_volume: f64, minutes: f64) -> f64 {
        (level + fill_rate.max(0.0) * minutes.max(0.0)).min(max_volume).max(0.0)
    }

    /// Minutes until `level` reaches `max_volume`: `Some(0.0)` if it already
    /// has, `None` if it never will.
    pub fn time_to_overflow(level: f64, fill_rate: f64, max_volume: f64) -> Option<f64> {
        if level >= max_volume {
            Some(0.0)
        } else if fill_rate > 0.0 {
            Some((max_volume - level) / fill_rate)
        } else {
            None
        }
    }

    /// Copy every reservoir's level out of `store`, projected to `at`.
    ///
    /// Uses the last reading at or before `at`; readings after `at` are
    /// ignored.  A reservoir with no such reading is assumed empty.
    pub fn snapshot(store: &TelemetryStore, at: DateTime<Utc>) -> LevelSnapshot {
        let mut snapshot = LevelSnapshot::new(at);
        for reservoir in store.reservoirs() {
            let site = &reservoir.id;
            let fill = store.fill_rate(site);
            let observed = store.series(site).and_then(|s| {
                let upto = s.readings().partition_point(|r| r.at <= at);
                upto.checked_sub(1).map(|i| s.readings()[i])
            });

            let mut state = ReservoirState::new(reservoir, 0.0);
            state.fill_rate = fill;
            state.drain_rate = store.drain_rate(site);
            match observed {
                Some(r) => {
                    let elapsed = minutes_between(r.at, at);
                    state.level = Self::project(r.volume, fill.unwrap_or(0.0), reservoir.max_volume, elapsed);
                    state.observed_at = Some(r.at);
                }
                None => warn!(%site, %at, "no reading at or before snapshot; assuming empty"),
            }
            debug!(%site, level = state.level, "snapshot level");
            snapshot.insert(state);
        }
        snapshot
    }
}
