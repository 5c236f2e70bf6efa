//! Static network configuration: reservoirs, the depot, and courier specs.
//!
//! These are loaded once and never mutated.  Fill and drain rates are
//! optional on input; when absent they are estimated from telemetry by
//! `cw-telemetry` and supplied alongside the reservoir where needed.

use crate::{CoreError, CoreResult, CourierId, GeoPoint, SiteId};

/// Minutes a courier spends unloading at the depot on every arrival.
pub const DEFAULT_UNLOAD_MINUTES: f64 = 15.0;

// ── Reservoir ─────────────────────────────────────────────────────────────────

/// A monitored tank with bounded capacity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reservoir {
    pub id: SiteId,
    pub name: String,
    pub location: GeoPoint,
    /// Capacity; the level must never reach this value.
    pub max_volume: f64,
    /// Inflow in volume/minute, if known.
    pub fill_rate: Option<f64>,
    /// Level decline in volume/minute while a courier is draining, if known.
    pub drain_rate: Option<f64>,
}

impl Reservoir {
    pub fn new(id: impl Into<SiteId>, name: impl Into<String>, location: GeoPoint, max_volume: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            max_volume,
            fill_rate: None,
            drain_rate: None,
        }
    }

    pub fn with_fill_rate(mut self, rate: f64) -> Self {
        self.fill_rate = Some(rate);
        self
    }

    pub fn with_drain_rate(mut self, rate: f64) -> Self {
        self.drain_rate = Some(rate);
        self
    }

    /// Check the numeric invariants: `max_volume > 0` and any supplied rate
    /// finite and strictly positive.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::InvalidSite { id: self.id.clone(), reason };

        if self.id.is_blank() {
            return Err(CoreError::Parse("reservoir with blank id".into()));
        }
        if !(self.max_volume.is_finite() && self.max_volume > 0.0) {
            return Err(invalid(format!("max_volume must be > 0, got {}", self.max_volume)));
        }
        for (what, rate) in [("fill_rate", self.fill_rate), ("drain_rate", self.drain_rate)] {
            if let Some(r) = rate {
                if !(r.is_finite() && r > 0.0) {
                    return Err(invalid(format!("{what} must be > 0, got {r}")));
                }
            }
        }
        Ok(())
    }
}

// ── Depot ─────────────────────────────────────────────────────────────────────

/// The single unload point.  No capacity constraint.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Depot {
    pub id: SiteId,
    pub name: String,
    pub location: GeoPoint,
    /// Consumed once per courier arrival.
    pub unload_minutes: f64,
}

impl Depot {
    pub fn new(id: impl Into<SiteId>, name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            unload_minutes: DEFAULT_UNLOAD_MINUTES,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.id.is_blank() {
            return Err(CoreError::Parse("depot with blank id".into()));
        }
        if !(self.unload_minutes.is_finite() && self.unload_minutes >= 0.0) {
            return Err(CoreError::InvalidSite {
                id: self.id.clone(),
                reason: format!("unload_minutes must be >= 0, got {}", self.unload_minutes),
            });
        }
        Ok(())
    }
}

// ── Couriers ──────────────────────────────────────────────────────────────────

/// Where a courier is when planning starts.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CourierStart {
    #[default]
    Depot,
    /// At (or about to leave) a known site.
    Site(SiteId),
    /// A reported position; snapped to the nearest site before planning.
    Position(GeoPoint),
}

/// One courier of a roster.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CourierSpec {
    pub id: CourierId,
    pub start: CourierStart,
    /// Maximum load carried between unloads.  `None` means the courier
    /// returns to the depot after every collection.
    pub capacity: Option<f64>,
}

impl CourierSpec {
    pub fn new(id: impl Into<CourierId>) -> Self {
        Self { id: id.into(), start: CourierStart::Depot, capacity: None }
    }

    pub fn starting_at(mut self, start: CourierStart) -> Self {
        self.start = start;
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }
}
