use thiserror::Error;

use cw_core::{CoreError, SiteId};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry parse error: {0}")]
    Parse(String),

    #[error("unknown reservoir {0}")]
    UnknownReservoir(SiteId),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;
