//! `LevelSeries`: the time-ordered readings of one reservoir.
//!
//! Inserts keep the sequence sorted by instant:
//!
//! - a reading after the last one is appended (the streaming fast path);
//! - a reading with an instant already present replaces that reading
//!   (the later-arriving value wins);
//! - an older reading is inserted at its sorted position.
//!
//! The series never interpolates.  Gaps wider than the configured threshold
//! split it into independent [`segments`](LevelSeries::segments).

use cw_core::{minutes_between, SiteId};

use crate::Reading;

/// What an insert did to the series.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Appended,
    /// Same instant as an existing reading; the value was overwritten.
    Replaced,
    /// Older than the newest reading; inserted in order.
    Backfilled,
}

#[derive(Clone, Debug)]
pub struct LevelSeries {
    site: SiteId,
    readings: Vec<Reading>,
}

impl LevelSeries {
    pub fn new(site: impl Into<SiteId>) -> Self {
        Self { site: site.into(), readings: Vec::new() }
    }

    /// Build from readings in any order.
    pub fn from_readings(site: impl Into<SiteId>, readings: impl IntoIterator<Item = Reading>) -> Self {
        let mut series = Self::new(site);
        for r in readings {
            series.insert(r);
        }
        series
    }

    pub fn insert(&mut self, reading: Reading) -> InsertOutcome {
        match self.readings.last() {
            None => {
                self.readings.push(reading);
                return InsertOutcome::Appended;
            }
            Some(last) if reading.at > last.at => {
                self.readings.push(reading);
                return InsertOutcome::Appended;
            }
            Some(_) => {}
        }
        match self.readings.binary_search_by(|r| r.at.cmp(&reading.at)) {
            Ok(i) => {
                self.readings[i] = reading;
                InsertOutcome::Replaced
            }
            Err(i) => {
                self.readings.insert(i, reading);
                InsertOutcome::Backfilled
            }
        }
    }

    pub fn site(&self) -> &SiteId {
        &self.site
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Maximal runs of readings whose consecutive spacing is at most
    /// `gap_threshold_minutes`.
    pub fn segments(&self, gap_threshold_minutes: f64) -> Vec<&[Reading]> {
        let mut out = Vec::new();
        let mut start = 0;
        for i in 1..self.readings.len() {
            if minutes_between(self.readings[i - 1].at, self.readings[i].at) > gap_threshold_minutes {
                out.push(&self.readings[start..i]);
                start = i;
            }
        }
        if start < self.readings.len() {
            out.push(&self.readings[start..]);
        }
        out
    }
}
