//! `cw-reconcile`: transport tickets and their reconciliation against
//! detected drain events.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`ticket`]     | `TicketRecord`, `TransportTicket`, `TicketBook`           |
//! | [`reconciler`] | `TicketReconciler`, `Discrepancy`, `UnloggedDrain`        |
//! | [`loader`]     | `load_tickets_csv`, `load_tickets_reader`                 |
//! | [`error`]      | `ReconcileError`, `ReconcileResult<T>`                    |
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut book = TicketBook::new(store.reservoirs().map(|r| r.id.clone()));
//! book.add_batch(load_tickets_csv(path)?);
//! let report = TicketReconciler::new(cfg.reconcile.clone())
//!     .reconcile(book.tickets(), &store.events_through_now());
//! ```

pub mod error;
pub mod loader;
pub mod reconciler;
pub mod ticket;

#[cfg(test)]
mod tests;

pub use error::{ReconcileError, ReconcileResult};
pub use loader::{load_tickets_csv, load_tickets_reader};
pub use reconciler::{
    classify, Classification, Discrepancy, ReconciliationReport, Severity, TicketReconciler, UnloggedDrain,
};
pub use ticket::{TicketBook, TicketRecord, TicketRejectReason, TicketRejection, TransportTicket, TICKET_DATE_FORMAT};
