//! `cw-network`: site graph, spatial snapping, and routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `NetworkGraph` (directed + undirected CSR, R-tree), `NetworkBuilder` |
//! | [`router`]  | `Router` trait, `Route`, `DijkstraRouter`, `TravelMatrix`   |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod error;
pub mod network;
pub mod router;

#[cfg(test)]
mod tests;

pub use error::{NetworkError, NetworkResult};
pub use network::{NetworkBuilder, NetworkGraph, NetworkWarning, SiteKind};
pub use router::{DijkstraRouter, Route, Router, TravelMatrix};
