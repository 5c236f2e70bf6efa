use thiserror::Error;

use cw_core::CoreError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("ticket parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
