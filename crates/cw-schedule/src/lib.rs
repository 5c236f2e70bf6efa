//! `cw-schedule`: level forecasting and courier route scheduling.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`forecast`]  | `Forecaster`: projection, time-to-overflow, snapshots     |
//! | [`snapshot`]  | `LevelSnapshot`, `ReservoirState`                          |
//! | [`scheduler`] | `RouteScheduler`: greedy EDF simulation, fleet search     |
//! | [`plan`]      | `RoutePlan`, `CourierRoute`, `Stop`, `FleetOutcome`        |
//! | [`error`]     | `ScheduleError`, `ScheduleResult<T>`                       |
//!
//! # Usage
//!
//! ```rust,ignore
//! let snapshot = Forecaster::snapshot(&store, now);
//! let scheduler = RouteScheduler::new(&graph, cfg.scheduler.clone())?;
//! match scheduler.plan_min_fleet(&snapshot, &roster)? {
//!     FleetOutcome::Feasible(plan) => println!("{} couriers", plan.required_courier_count),
//!     FleetOutcome::Infeasible { max_fleet, .. } => println!("none within {max_fleet}"),
//! }
//! ```

mod dispatch_queue;
pub mod error;
pub mod forecast;
pub mod plan;
pub mod scheduler;
pub mod snapshot;


pub use error::{ScheduleError, ScheduleResult};
pub use forecast::Forecaster;
pub use plan::{CourierRoute, FleetOutcome, Overflow, RoutePlan, Stop, StopKind};
pub use scheduler::RouteScheduler;
pub use snapshot::{LevelSnapshot, ReservoirState};
