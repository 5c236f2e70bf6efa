//! Transport tickets.
//!
//! A ticket says "on this date, this much was collected from this
//! reservoir".  It never carries a time of day, so everything downstream
//! works on calendar dates only.
//!
//! Raw `TicketRecord`s are validated into `TransportTicket`s by a
//! [`TicketBook`], which knows the configured reservoirs.  A bad record is
//! rejected on its own; the rest of the batch is kept.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use cw_core::{CourierId, SiteId};

/// Calendar date format accepted on tickets.
pub const TICKET_DATE_FORMAT: &str = "%Y-%m-%d";

// ── TicketRecord ──────────────────────────────────────────────────────────────

/// A ticket as supplied by a collaborator, every field optional.
///
/// `date` may also be given as a full RFC 3339 timestamp; only its calendar
/// date part is used.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TicketRecord {
    #[serde(alias = "cauldron_id")]
    pub reservoir_id: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "amount_collected", alias = "volume_collected")]
    pub volume: Option<f64>,
    pub ticket_id: Option<String>,
    pub courier_id: Option<String>,
}

impl TicketRecord {
    pub fn new(reservoir_id: &str, date: &str, volume: f64) -> Self {
        Self {
            reservoir_id: Some(reservoir_id.to_owned()),
            date: Some(date.to_owned()),
            volume: Some(volume),
            ..Self::default()
        }
    }

    pub fn with_ticket_id(mut self, id: &str) -> Self {
        self.ticket_id = Some(id.to_owned());
        self
    }

    pub fn with_courier(mut self, id: &str) -> Self {
        self.courier_id = Some(id.to_owned());
        self
    }

    /// Check fields and ranges.  Reservoir existence is checked by the
    /// [`TicketBook`].
    pub fn validate(&self) -> Result<TransportTicket, TicketRejectReason> {
        let site = match self.reservoir_id.as_deref().map(SiteId::new) {
            Some(id) if !id.is_blank() => id,
            _ => return Err(TicketRejectReason::MissingField("reservoir_id")),
        };
        let raw_date = self
            .date
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(TicketRejectReason::MissingField("date"))?;
        let date = parse_ticket_date(raw_date).ok_or_else(|| TicketRejectReason::BadDate(raw_date.to_owned()))?;
        let volume = self.volume.ok_or(TicketRejectReason::MissingField("volume"))?;
        if !(volume.is_finite() && volume >= 0.0) {
            return Err(TicketRejectReason::InvalidVolume(volume));
        }
        Ok(TransportTicket {
            site,
            date,
            volume,
            ticket_id: self.ticket_id.clone().filter(|s| !s.trim().is_empty()),
            courier_id: self.courier_id.as_deref().map(CourierId::new).filter(|c| !c.is_blank()),
        })
    }
}

fn parse_ticket_date(raw: &str) -> Option<NaiveDate> {
    // Take the leading `YYYY-MM-DD` of a timestamp; never convert time zones.
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, TICKET_DATE_FORMAT).ok()
}

// ── TransportTicket ───────────────────────────────────────────────────────────

/// A validated ticket.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportTicket {
    pub site: SiteId,
    pub date: NaiveDate,
    pub volume: f64,
    pub ticket_id: Option<String>,
    pub courier_id: Option<CourierId>,
}

impl TransportTicket {
    pub fn new(site: impl Into<SiteId>, date: NaiveDate, volume: f64) -> Self {
        Self { site: site.into(), date, volume, ticket_id: None, courier_id: None }
    }
}

// ── Rejections ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Error)]
pub enum TicketRejectReason {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("date {0:?} is not YYYY-MM-DD")]
    BadDate(String),

    #[error("volume {0} is negative or not finite")]
    InvalidVolume(f64),

    #[error("unknown reservoir {0}")]
    UnknownReservoir(SiteId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TicketRejection {
    pub index: usize,
    pub reason: TicketRejectReason,
}

// ── TicketBook ────────────────────────────────────────────────────────────────

/// Accepted tickets for a known set of reservoirs.
#[derive(Clone, Debug, Default)]
pub struct TicketBook {
    known: BTreeSet<SiteId>,
    tickets: Vec<TransportTicket>,
}

impl TicketBook {
    pub fn new(known: impl IntoIterator<Item = SiteId>) -> Self {
        Self { known: known.into_iter().collect(), tickets: Vec::new() }
    }

    /// Validate and keep one ticket.
    pub fn add(&mut self, record: &TicketRecord) -> Result<(), TicketRejectReason> {
        let ticket = record.validate()?;
        self.add_ticket(ticket)
    }

    pub fn add_ticket(&mut self, ticket: TransportTicket) -> Result<(), TicketRejectReason> {
        if !self.known.contains(&ticket.site) {
            return Err(TicketRejectReason::UnknownReservoir(ticket.site));
        }
        self.tickets.push(ticket);
        Ok(())
    }

    /// Add a batch; returns what was rejected.
    pub fn add_batch(&mut self, records: impl IntoIterator<Item = TicketRecord>) -> Vec<TicketRejection> {
        let mut rejected = Vec::new();
        let mut accepted = 0usize;
        for (index, record) in records.into_iter().enumerate() {
            match self.add(&record) {
                Ok(()) => accepted += 1,
                Err(reason) => {
                    warn!(index, %reason, "ticket rejected");
                    rejected.push(TicketRejection { index, reason });
                }
            }
        }
        info!(accepted, rejected = rejected.len(), "tickets loaded");
        rejected
    }

    pub fn tickets(&self) -> &[TransportTicket] {
        &self.tickets
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}
