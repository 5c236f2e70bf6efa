//! `RouteScheduler`: minimum-fleet courier scheduling.
//!
//! # Policy
//!
//! Each reservoir's deadline is the instant its level reaches capacity:
//!
//! ```text
//! deadline = base_time + (max_volume − base_level) / fill_rate
//! ```
//!
//! where `(base_level, base_time)` is the snapshot level, or zero at the
//! moment a courier last finished draining it.  A greedy simulation then
//! runs over the horizon.  Whenever a courier is free it is sent to the
//! unclaimed reservoir with the **earliest deadline** it can reach strictly
//! before that deadline (ties: nearest, then site id).  The reservoir is
//! drained to zero and the courier unloads at the depot, paying the unload
//! duration on every depot arrival.  A courier with nothing reachable waits
//! `idle_minutes` and looks again.
//!
//! The fleet of size `k` fails as soon as an unclaimed reservoir's deadline
//! passes, or if one would pass before the horizon ends.
//!
//! # Couriers
//!
//! - Without a capacity a courier unloads after every collection.
//! - With a capacity it chains collections while its load plus the next
//!   collection fits, and unloads first otherwise.  An empty courier always
//!   accepts.
//! - Collecting takes `level / drain_rate` minutes when a drain rate is
//!   known, during which inflow continues and is collected too.  A
//!   collection that would outlast the horizon stops at the horizon and
//!   leaves the undrained rest in the reservoir.
//!
//! # Fleet search
//!
//! `k = 0, 1, 2, …` up to the ceiling; the first `k` whose run succeeds is
//! returned.  Fleet `k` is the first `k` couriers of the roster, then extra
//! couriers starting at the depot.  Since `k` is only tried after every
//! smaller fleet failed, "feasible at `k`" means "some fleet of at most `k`
//! succeeds, the rest idle", which can never get worse as `k` grows.
//!
//! This is a heuristic: it returns a plan that never overflows under this
//! policy, not a proven minimum over all policies.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use cw_core::{CourierId, CourierSpec, CourierStart, NodeId, SchedulerConfig, SiteId};
use cw_network::{DijkstraRouter, NetworkGraph, Router, TravelMatrix};

use crate::dispatch_queue::DispatchQueue;
use crate::{
    CourierRoute, FleetOutcome, LevelSnapshot, Overflow, RoutePlan, ScheduleError, ScheduleResult, Stop, StopKind,
};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Upper bound on any simulated offset, about 30 000 years.
const MAX_MS: f64 = 1e15;

/// Negative and NaN map to 0, anything past `MAX_MS` to `MAX_MS`.
#[inline]
fn to_ms(minutes: f64) -> u64 {
    let ms = (minutes * MS_PER_MINUTE).round();
    if ms > 0.0 { ms.min(MAX_MS) as u64 } else { 0 }
}

#[inline]
fn to_min(ms: u64) -> f64 {
    ms as f64 / MS_PER_MINUTE
}

/// `start + ms`, saturating at the latest representable instant.
fn instant(start: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(Duration::try_milliseconds)
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ── Simulation state ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Tank {
    site: SiteId,
    node: NodeId,
    max: f64,
    fill: f64,
    drain: Option<f64>,
    base_level: f64,
    base_ms: u64,
    /// A courier is committed to this tank until this instant.
    claimed_until: u64,
}

impl Tank {
    fn level_at(&self, ms: u64) -> f64 {
        let elapsed = to_min(ms.saturating_sub(self.base_ms));
        (self.base_level + self.fill * elapsed).min(self.max)
    }

    /// Minute (from the snapshot) at which the tank reaches capacity.
    fn deadline(&self) -> f64 {
        if self.base_level >= self.max {
            to_min(self.base_ms)
        } else if self.fill > 0.0 {
            to_min(self.base_ms) + (self.max - self.base_level) / self.fill
        } else {
            f64::INFINITY
        }
    }

    fn is_free(&self, ms: u64) -> bool {
        self.claimed_until <= ms
    }
}

/// A fleet member before simulation.
#[derive(Clone, Debug)]
struct Slot {
    id: CourierId,
    start: NodeId,
    capacity: Option<f64>,
}

struct Courier {
    node: NodeId,
    load: f64,
    capacity: Option<f64>,
    stops: Vec<Stop>,
}

struct Candidate {
    tank: usize,
    deadline: f64,
    travel_ms: u64,
}

// ── RouteScheduler ────────────────────────────────────────────────────────────

pub struct RouteScheduler<'g> {
    graph: &'g NetworkGraph,
    matrix: TravelMatrix,
    depot: NodeId,
    unload_ms: u64,
    cfg: SchedulerConfig,
}

impl<'g> RouteScheduler<'g> {
    /// Precompute travel times over `graph` with Dijkstra.
    pub fn new(graph: &'g NetworkGraph, cfg: SchedulerConfig) -> ScheduleResult<Self> {
        Self::with_router(graph, &DijkstraRouter, cfg)
    }

    pub fn with_router<R: Router>(graph: &'g NetworkGraph, router: &R, cfg: SchedulerConfig) -> ScheduleResult<Self> {
        let depot = graph.depot().ok_or(ScheduleError::NoDepot)?;
        let matrix = TravelMatrix::build(router, graph, cfg.directed);
        let unload_ms = to_ms(cfg.unload_minutes.unwrap_or_else(|| graph.unload_minutes()));
        Ok(Self { graph, matrix, depot, unload_ms, cfg })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// Smallest fleet, up to `max_fleet`, that keeps every reservoir below
    /// capacity.  `roster` supplies identities and start positions for the
    /// first couriers; any further courier starts at the depot.
    pub fn plan_min_fleet(&self, snapshot: &LevelSnapshot, roster: &[CourierSpec]) -> ScheduleResult<FleetOutcome> {
        let fleet = self.fleet(roster, self.cfg.max_fleet)?;
        Ok(self.search(snapshot, &fleet, false))
    }

    /// Plan with exactly the roster.  Couriers not needed stay idle and
    /// appear in the plan with no stops.
    pub fn plan_fixed_fleet(&self, snapshot: &LevelSnapshot, roster: &[CourierSpec]) -> ScheduleResult<FleetOutcome> {
        let fleet = self.fleet(roster, roster.len())?;
        Ok(self.search(snapshot, &fleet, true))
    }

    /// Run the greedy policy once with exactly `couriers`.
    pub fn simulate(&self, snapshot: &LevelSnapshot, couriers: &[CourierSpec]) -> ScheduleResult<Result<Vec<CourierRoute>, Overflow>> {
        let fleet = self.fleet(couriers, couriers.len())?;
        Ok(self.run(snapshot, &fleet))
    }

    // ── Fleet search ──────────────────────────────────────────────────────

    fn search(&self, snapshot: &LevelSnapshot, fleet: &[Slot], keep_idle: bool) -> FleetOutcome {
        let mut last_overflow = None;
        for k in 0..=fleet.len() {
            match self.run(snapshot, &fleet[..k]) {
                Ok(mut routes) => {
                    info!(couriers = k, "feasible schedule found");
                    if keep_idle {
                        routes.extend(fleet[k..].iter().map(|s| self.idle_route(s)));
                    }
                    return FleetOutcome::Feasible(RoutePlan {
                        start: snapshot.at,
                        horizon_end: instant(snapshot.at, to_ms(self.cfg.horizon_minutes)),
                        required_courier_count: k,
                        couriers: routes,
                    });
                }
                Err(overflow) => {
                    debug!(couriers = k, site = %overflow.site, at = %overflow.at, "fleet size infeasible");
                    last_overflow = Some(overflow);
                }
            }
        }
        warn!(max_fleet = fleet.len(), "no feasible schedule within fleet ceiling");
        FleetOutcome::Infeasible { max_fleet: fleet.len(), overflow: last_overflow }
    }

    fn fleet(&self, roster: &[CourierSpec], size: usize) -> ScheduleResult<Vec<Slot>> {
        let mut slots = Vec::with_capacity(size);
        for spec in roster.iter().take(size) {
            slots.push(Slot {
                id: spec.id.clone(),
                start: self.resolve_start(spec)?,
                capacity: spec.capacity.or(self.cfg.courier_capacity),
            });
        }
        let mut n = 1;
        while slots.len() < size {
            let id = CourierId::numbered(n);
            n += 1;
            if roster.iter().any(|c| c.id == id) {
                continue;
            }
            slots.push(Slot { id, start: self.depot, capacity: self.cfg.courier_capacity });
        }
        Ok(slots)
    }

    fn resolve_start(&self, spec: &CourierSpec) -> ScheduleResult<NodeId> {
        match &spec.start {
            CourierStart::Depot => Ok(self.depot),
            CourierStart::Site(site) => self.graph.node(site).ok_or_else(|| ScheduleError::UnknownStart {
                courier: spec.id.clone(),
                site: site.clone(),
            }),
            CourierStart::Position(pos) => {
                let node = pos
                    .is_valid()
                    .then(|| self.graph.snap_to_site(*pos))
                    .flatten()
                    .ok_or_else(|| ScheduleError::UnplaceableCourier { courier: spec.id.clone(), position: *pos })?;
                debug!(
                    courier = %spec.id,
                    site = %self.graph.site_id(node),
                    distance_m = pos.distance_m(self.graph.site_pos[node.index()]),
                    "courier snapped to nearest site",
                );
                Ok(node)
            }
        }
    }

    fn idle_route(&self, slot: &Slot) -> CourierRoute {
        CourierRoute { courier: slot.id.clone(), start: self.graph.site_id(slot.start).clone(), stops: Vec::new() }
    }

    // ── Greedy simulation ─────────────────────────────────────────────────

    fn tanks(&self, snapshot: &LevelSnapshot) -> Vec<Tank> {
        snapshot
            .states()
            .filter_map(|s| {
                let Some(node) = self.graph.node(&s.site) else {
                    warn!(site = %s.site, "snapshot reservoir not in network; ignored");
                    return None;
                };
                Some(Tank {
                    site: s.site.clone(),
                    node,
                    max: s.max_volume,
                    fill: s.fill_rate.unwrap_or(0.0).max(0.0),
                    drain: s.drain_rate.filter(|d| *d > 0.0),
                    base_level: s.level.max(0.0),
                    base_ms: 0,
                    claimed_until: 0,
                })
            })
            .collect()
    }

    fn run(&self, snapshot: &LevelSnapshot, fleet: &[Slot]) -> Result<Vec<CourierRoute>, Overflow> {
        let horizon_ms = to_ms(self.cfg.horizon_minutes);
        let mut tanks = self.tanks(snapshot);
        let mut couriers: Vec<Courier> = fleet
            .iter()
            .map(|s| Courier { node: s.start, load: 0.0, capacity: s.capacity, stops: Vec::new() })
            .collect();

        let mut queue = DispatchQueue::new();
        for i in 0..couriers.len() {
            queue.push(0, i);
        }

        while let Some((now, i)) = queue.pop() {
            if now >= horizon_ms {
                break;
            }
            if let Some(tank) = Self::overdue(&tanks, now, to_min(now), true) {
                return Err(self.overflow(snapshot.at, tank));
            }
            let next = self.dispatch(snapshot.at, now, &mut couriers[i], &mut tanks);
            queue.push(next, i);
        }

        if let Some(tank) = Self::overdue(&tanks, horizon_ms, to_min(horizon_ms), false) {
            return Err(self.overflow(snapshot.at, tank));
        }

        Ok(fleet
            .iter()
            .zip(couriers)
            .map(|(slot, c)| CourierRoute {
                courier: slot.id.clone(),
                start: self.graph.site_id(slot.start).clone(),
                stops: c.stops,
            })
            .collect())
    }

    /// The unclaimed tank with the earliest deadline at or before (or,
    /// with `inclusive` false, strictly before) `minute`.
    fn overdue(tanks: &[Tank], now: u64, minute: f64, inclusive: bool) -> Option<&Tank> {
        tanks
            .iter()
            .filter(|t| t.is_free(now))
            .filter(|t| if inclusive { t.deadline() <= minute } else { t.deadline() < minute })
            .min_by(|a, b| a.deadline().total_cmp(&b.deadline()))
    }

    fn overflow(&self, start: DateTime<Utc>, tank: &Tank) -> Overflow {
        Overflow { site: tank.site.clone(), at: instant(start, to_ms(tank.deadline())) }
    }

    /// Give courier a task at `now`; returns when it is next free.
    fn dispatch(&self, start: DateTime<Utc>, now: u64, courier: &mut Courier, tanks: &mut [Tank]) -> u64 {
        let Some(pick) = self.pick(now, courier.node, tanks) else {
            if courier.load > 0.0 {
                return self.unload(start, now, courier);
            }
            return now.saturating_add(to_ms(self.cfg.idle_minutes).max(1));
        };

        let horizon_ms = to_ms(self.cfg.horizon_minutes);
        let tank = &mut tanks[pick.tank];
        let arrival = now.saturating_add(pick.travel_ms);
        let level = tank.level_at(arrival);
        let full_ms = tank.drain.map_or(0, |d| to_ms(level / d));

        // What the courier carries away and what stays in the tank.
        let (collect_ms, gross, rest) = match tank.drain {
            Some(d) if arrival < horizon_ms && arrival.saturating_add(full_ms) > horizon_ms => {
                let collect_ms = horizon_ms - arrival;
                let t = to_min(collect_ms);
                (collect_ms, (d + tank.fill) * t, (level - d * t).max(0.0))
            }
            _ => (full_ms, (level + tank.fill * to_min(full_ms)).min(tank.max), 0.0),
        };

        if let Some(cap) = courier.capacity {
            if courier.load > 0.0 && courier.load + gross > cap {
                debug!(site = %tank.site, load = courier.load, gross, cap, "over capacity; unloading first");
                return self.unload(start, now, courier);
            }
        }

        let departure = arrival.saturating_add(collect_ms);
        if rest > 0.0 {
            debug!(site = %tank.site, rest, "collection cut off at the horizon");
        }
        courier.stops.push(Stop {
            site: tank.site.clone(),
            kind: StopKind::Collect,
            arrival: instant(start, arrival),
            departure: instant(start, departure),
            volume: gross,
        });
        tank.base_level = rest;
        tank.base_ms = departure;
        tank.claimed_until = departure;
        courier.node = tank.node;
        courier.load += gross;

        if courier.capacity.is_none() {
            self.unload(start, departure, courier)
        } else {
            departure
        }
    }

    /// Earliest-deadline reachable tank; ties by travel time then site id.
    fn pick(&self, now: u64, from: NodeId, tanks: &[Tank]) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for (i, tank) in tanks.iter().enumerate() {
            let deadline = tank.deadline();
            if !tank.is_free(now) || !deadline.is_finite() || tank.level_at(now) <= 0.0 {
                continue;
            }
            let Some(travel) = self.matrix.millis(from, tank.node) else { continue };
            if self.matrix.millis(tank.node, self.depot).is_none() {
                continue;
            }
            let travel_ms = travel as u64;
            if to_min(now.saturating_add(travel_ms)) >= deadline {
                continue;
            }
            let better = match &best {
                None => true,
                Some(b) => deadline
                    .total_cmp(&b.deadline)
                    .then(travel_ms.cmp(&b.travel_ms))
                    .then_with(|| tank.site.cmp(&tanks[b.tank].site))
                    .is_lt(),
            };
            if better {
                best = Some(Candidate { tank: i, deadline, travel_ms });
            }
        }
        best
    }

    /// Drive to the depot and unload; returns the departure.
    fn unload(&self, start: DateTime<Utc>, now: u64, courier: &mut Courier) -> u64 {
        let Some(travel) = self.matrix.millis(courier.node, self.depot) else {
            warn!(at = %self.graph.site_id(courier.node), "depot unreachable; courier waits");
            return now.saturating_add(to_ms(self.cfg.idle_minutes).max(1));
        };
        let arrival = now.saturating_add(travel as u64);
        let departure = arrival.saturating_add(self.unload_ms);
        courier.stops.push(Stop {
            site: self.graph.site_id(self.depot).clone(),
            kind: StopKind::Unload,
            arrival: instant(start, arrival),
            departure: instant(start, departure),
            volume: courier.load,
        });
        courier.load = 0.0;
        courier.node = self.depot;
        departure
    }
}
