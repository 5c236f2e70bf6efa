//! Engine-wide base error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

use crate::SiteId;

/// The top-level error type for `cw-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("site {0} not found")]
    SiteNotFound(SiteId),

    #[error("duplicate site id {0}")]
    DuplicateSite(SiteId),

    #[error("invalid site {id}: {reason}")]
    InvalidSite { id: SiteId, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `cw-core`.
pub type CoreResult<T> = Result<T, CoreError>;
