//! Time model.
//!
//! # Design
//!
//! Instants are `chrono::DateTime<Utc>`.  Inputs arrive with explicit
//! offsets and are normalised to UTC at the ingestion boundary, so every
//! comparison inside the engine is between UTC instants.
//!
//! Durations that feed rate arithmetic (fill rates are volume/minute) are
//! expressed as `f64` minutes via [`minutes_between`].  Millisecond
//! precision is kept when converting back with [`plus_minutes`].
//!
//! Tickets carry a calendar date only.  Which instants belong to that date
//! is decided by a [`DayBoundary`]: a fixed UTC offset for the reservoirs'
//! local time plus the minute of the local day at which a "day" starts.
//! Both are configuration; nothing infers them from the data.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Minutes elapsed from `earlier` to `later` (negative if reversed).
#[inline]
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / MS_PER_MINUTE
}

/// The instant `minutes` after `at`, rounded to the millisecond.
#[inline]
pub fn plus_minutes(at: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    at + Duration::milliseconds((minutes * MS_PER_MINUTE).round() as i64)
}

// ── DayBoundary ───────────────────────────────────────────────────────────────

/// Maps instants to the reservoir-local calendar date used by tickets.
///
/// `local_date(t)` is the date of `t + utc_offset - day_start`: with
/// `utc_offset_minutes = -300` and `day_start_minutes = 360`, the ticket
/// date `2024-01-05` covers `2024-01-05T06:00-05:00` up to (excluding)
/// `2024-01-06T06:00-05:00`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DayBoundary {
    /// Offset of reservoir-local time from UTC, in minutes (east positive).
    pub utc_offset_minutes: i32,
    /// Minute of the local day at which a reconciliation day begins (0..1440).
    pub day_start_minutes: u32,
}

impl DayBoundary {
    pub const UTC_MIDNIGHT: DayBoundary = DayBoundary { utc_offset_minutes: 0, day_start_minutes: 0 };

    pub fn new(utc_offset_minutes: i32, day_start_minutes: u32) -> Self {
        Self { utc_offset_minutes, day_start_minutes }
    }

    #[inline]
    fn shift(&self) -> Duration {
        Duration::minutes(self.utc_offset_minutes as i64 - self.day_start_minutes as i64)
    }

    /// The reconciliation date that `at` falls on.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        (at + self.shift()).date_naive()
    }

    /// Half-open UTC window `[start, end)` covered by `date`.
    pub fn window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = date.and_time(NaiveTime::MIN).and_utc() - self.shift();
        (start, start + Duration::days(1))
    }

    /// `true` if the configured values are in range.
    pub fn is_valid(&self) -> bool {
        self.day_start_minutes < 1_440 && self.utc_offset_minutes.abs() <= 14 * 60
    }
}
