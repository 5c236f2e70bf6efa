//! Network-subsystem error type.

use thiserror::Error;

use cw_core::{CoreError, NodeId, SiteId};

/// Errors produced by `cw-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// An edge references a site that was never added.
    #[error("edge {from} -> {to} references unknown node {missing}")]
    UnknownNode { from: SiteId, to: SiteId, missing: SiteId },

    #[error("site {0} not found in network")]
    SiteNotFound(SiteId),

    #[error("duplicate site {0}")]
    DuplicateSite(SiteId),

    /// A network has a single depot.
    #[error("site {rejected} cannot be a depot; {existing} already is")]
    SecondDepot { existing: SiteId, rejected: SiteId },

    #[error("edge {from} -> {to} has invalid travel time {minutes}")]
    InvalidTravelTime { from: SiteId, to: SiteId, minutes: f64 },

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
