//! `cw-core`: foundational types for the `cauldron_watch` engine.
//!
//! This crate is a dependency of every other `cw-*` crate.  It has no `cw-*`
//! dependencies and minimal external ones (only `chrono` and `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `NodeId` (graph index), `SiteId`, `CourierId` (text ids)   |
//! | [`geo`]    | `GeoPoint`, haversine distance                             |
//! | [`time`]   | `DayBoundary`, minute arithmetic on `DateTime<Utc>`        |
//! | [`site`]   | `Reservoir`, `Depot`, `CourierStart`, `CourierSpec`        |
//! | [`config`] | `EngineConfig` and its per-component sections              |
//! | [`error`]  | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod site;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{DetectorConfig, EngineConfig, ReconcileConfig, SchedulerConfig, Tolerance};
pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{CourierId, NodeId, SiteId};
pub use site::{CourierSpec, CourierStart, Depot, Reservoir, DEFAULT_UNLOAD_MINUTES};
pub use time::{minutes_between, plus_minutes, DayBoundary};
