use thiserror::Error;

use cw_core::{CourierId, GeoPoint, SiteId};
use cw_network::NetworkError;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("the network has no depot")]
    NoDepot,

    #[error("courier {courier} starts at unknown site {site}")]
    UnknownStart { courier: CourierId, site: SiteId },

    /// The courier's reported position is not a usable coordinate.
    #[error("courier {courier} reported unusable position {position}")]
    UnplaceableCourier { courier: CourierId, position: GeoPoint },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
