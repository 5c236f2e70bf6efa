//! `LevelSnapshot`: a consistent copy of every reservoir's level at one
//! instant.
//!
//! The scheduler only ever reads a snapshot, never the live telemetry
//! store, so ingestion may continue while a plan is being computed.  A plan
//! built from a stale snapshot is simply replaced by the next one.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use cw_core::{Reservoir, SiteId};

use crate::Forecaster;

/// One reservoir's level and rates as of the snapshot instant.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservoirState {
    pub site: SiteId,
    pub level: f64,
    pub max_volume: f64,
    pub fill_rate: Option<f64>,
    pub drain_rate: Option<f64>,
    /// Instant of the reading `level` was projected from, if any.
    pub observed_at: Option<DateTime<Utc>>,
}

impl ReservoirState {
    /// State with the reservoir's configured rates.
    pub fn new(reservoir: &Reservoir, level: f64) -> Self {
        Self {
            site: reservoir.id.clone(),
            level,
            max_volume: reservoir.max_volume,
            fill_rate: reservoir.fill_rate,
            drain_rate: reservoir.drain_rate,
            observed_at: None,
        }
    }

    /// Minutes from the snapshot until `max_volume` is reached.
    pub fn minutes_to_overflow(&self) -> Option<f64> {
        Forecaster::time_to_overflow(self.level, self.fill_rate.unwrap_or(0.0), self.max_volume)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelSnapshot {
    pub at: DateTime<Utc>,
    states: BTreeMap<SiteId, ReservoirState>,
}

impl LevelSnapshot {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at, states: BTreeMap::new() }
    }

    pub fn with_state(mut self, state: ReservoirState) -> Self {
        self.insert(state);
        self
    }

    /// Add or replace a reservoir's state.
    pub fn insert(&mut self, state: ReservoirState) {
        self.states.insert(state.site.clone(), state);
    }

    pub fn get(&self, site: &SiteId) -> Option<&ReservoirState> {
        self.states.get(site)
    }

    /// States in ascending site order.
    pub fn states(&self) -> impl Iterator<Item = &ReservoirState> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
