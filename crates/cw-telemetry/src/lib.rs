//! `cw-telemetry`: level series, rate estimation, and drain detection.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`sample`]   | `Reading`, `LevelSample`, `TelemetryRecord`, `Rejection`  |
//! | [`series`]   | `LevelSeries` (time-ordered, gap-segmented)               |
//! | [`rates`]    | `RateEstimate`, `estimate_rates`                          |
//! | [`detector`] | `DrainDetector` state machine, `DrainEvent`, `detect`     |
//! | [`store`]    | `TelemetryStore`: one owned channel per reservoir        |
//! | [`loader`]   | `load_samples_csv`, `load_samples_reader`                 |
//! | [`synth`]    | `SyntheticSeries`: seeded noisy series with drains       |
//! | [`error`]    | `TelemetryError`, `TelemetryResult<T>`                    |
//!
//! # Data flow (summary)
//!
//! ```text
//! TelemetryRecord ─validate─► LevelSample ─► TelemetryStore
//!                                              └─ per reservoir:
//!                                                   LevelSeries.insert
//!                                                   DrainDetector.push ─► DrainEvent
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | `ingest_batch` processes reservoirs on Rayon's pool.   |

pub mod detector;
pub mod error;
pub mod loader;
pub mod rates;
pub mod sample;
pub mod series;
pub mod store;
pub mod synth;

#[cfg(test)]
mod tests;

pub use detector::{detect, DetectorState, DrainAnomaly, DrainDetector, DrainEvent};
pub use error::{TelemetryError, TelemetryResult};
pub use loader::{load_samples_csv, load_samples_reader};
pub use rates::{estimate_rates, RateEstimate};
pub use sample::{LevelSample, Reading, RejectReason, Rejection, TelemetryRecord};
pub use series::{InsertOutcome, LevelSeries};
pub use store::{IngestOutcome, IngestReport, TelemetryStore};
pub use synth::{InjectedDrain, SyntheticSeries};
