//! Route plans and scheduling outcomes.

use chrono::{DateTime, Utc};

use cw_core::{CourierId, SiteId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StopKind {
    /// Drain a reservoir.
    Collect,
    /// Unload at the depot.
    Unload,
}

impl StopKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StopKind::Collect => "collect",
            StopKind::Unload => "unload",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub site: SiteId,
    pub kind: StopKind,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    /// Collected at a reservoir, or delivered at the depot.
    pub volume: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CourierRoute {
    pub courier: CourierId,
    /// Where the courier was at the snapshot instant.
    pub start: SiteId,
    pub stops: Vec<Stop>,
}

impl CourierRoute {
    pub fn is_idle(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn collected(&self) -> f64 {
        self.stops.iter().filter(|s| s.kind == StopKind::Collect).map(|s| s.volume).sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoutePlan {
    /// The snapshot instant the plan starts from.
    pub start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    /// Couriers with at least one task in the plan.
    pub required_courier_count: usize,
    pub couriers: Vec<CourierRoute>,
}

/// The first reservoir found to overflow in a failed plan.
#[derive(Clone, Debug, PartialEq)]
pub struct Overflow {
    pub site: SiteId,
    /// When its level reaches capacity.
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FleetOutcome {
    Feasible(RoutePlan),
    /// No fleet of up to `max_fleet` couriers keeps every reservoir below
    /// capacity under the greedy policy.
    Infeasible { max_fleet: usize, overflow: Option<Overflow> },
}

impl FleetOutcome {
    pub fn plan(&self) -> Option<&RoutePlan> {
        match self {
            FleetOutcome::Feasible(plan) => Some(plan),
            FleetOutcome::Infeasible { .. } => None,
        }
    }

    pub fn required_courier_count(&self) -> Option<usize> {
        self.plan().map(|p| p.required_courier_count)
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, FleetOutcome::Feasible(_))
    }
}
