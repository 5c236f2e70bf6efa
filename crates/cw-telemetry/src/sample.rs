//! Telemetry records and their validation.
//!
//! Records arrive untyped (`TelemetryRecord`, every field optional) and are
//! validated one at a time into `LevelSample`s.  A bad record is rejected on
//! its own with a [`RejectReason`]; the stream it came from keeps flowing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use cw_core::SiteId;

// ── Reading ───────────────────────────────────────────────────────────────────

/// One level observation, without the reservoir it belongs to.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    pub at: DateTime<Utc>,
    pub volume: f64,
}

impl Reading {
    pub fn new(at: DateTime<Utc>, volume: f64) -> Self {
        Self { at, volume }
    }
}

// ── LevelSample ───────────────────────────────────────────────────────────────

/// A validated observation: known shape, non-negative finite volume, UTC
/// instant.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSample {
    pub site: SiteId,
    pub at: DateTime<Utc>,
    pub volume: f64,
}

impl LevelSample {
    pub fn new(site: impl Into<SiteId>, at: DateTime<Utc>, volume: f64) -> Self {
        Self { site: site.into(), at, volume }
    }

    pub fn reading(&self) -> Reading {
        Reading { at: self.at, volume: self.volume }
    }
}

// ── TelemetryRecord ───────────────────────────────────────────────────────────

/// A raw record as supplied by a collaborator.
///
/// `timestamp` must be RFC 3339 with an explicit offset (`Z` or `±hh:mm`);
/// naive timestamps are rejected rather than guessed.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TelemetryRecord {
    #[serde(alias = "cauldron_id")]
    pub reservoir_id: Option<String>,
    pub timestamp: Option<String>,
    #[serde(alias = "level")]
    pub volume: Option<f64>,
}

impl TelemetryRecord {
    pub fn new(reservoir_id: &str, timestamp: &str, volume: f64) -> Self {
        Self {
            reservoir_id: Some(reservoir_id.to_owned()),
            timestamp: Some(timestamp.to_owned()),
            volume: Some(volume),
        }
    }

    /// Check required fields and value ranges.  Does not check that the
    /// reservoir exists; that is the store's job.
    pub fn validate(&self) -> Result<LevelSample, RejectReason> {
        let site = match self.reservoir_id.as_deref().map(SiteId::new) {
            Some(id) if !id.is_blank() => id,
            _ => return Err(RejectReason::MissingField("reservoir_id")),
        };
        let raw_ts = self
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RejectReason::MissingField("timestamp"))?;
        let at = DateTime::parse_from_rfc3339(raw_ts)
            .map_err(|_| RejectReason::BadTimestamp(raw_ts.to_owned()))?
            .with_timezone(&Utc);
        let volume = self.volume.ok_or(RejectReason::MissingField("volume"))?;
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(RejectReason::InvalidVolume(volume));
        }
        Ok(LevelSample { site, at, volume })
    }
}

// ── Rejections ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Error)]
pub enum RejectReason {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("timestamp {0:?} is not RFC 3339 with an offset")]
    BadTimestamp(String),

    #[error("volume {0} is negative or not finite")]
    InvalidVolume(f64),

    #[error("unknown reservoir {0}")]
    UnknownReservoir(SiteId),
}

/// A record that was dropped, with its position in the input.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectReason,
}
