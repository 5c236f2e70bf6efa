//! Routing trait, default Dijkstra implementation, and travel matrix.
//!
//! # Pluggability
//!
//! The scheduler asks for travel times through a [`TravelMatrix`], which is
//! filled by any [`Router`].  The default [`DijkstraRouter`] is exact for the
//! small site graphs this engine handles.
//!
//! # Cost units
//!
//! Costs are integer **milliseconds** (u32) internally, so path sums are
//! exact.  Public results expose `f64` minutes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use cw_core::NodeId;

use crate::network::NetworkGraph;
use crate::NetworkError;

const MS_PER_MINUTE: f64 = 60_000.0;
const UNREACHED: u32 = u32::MAX;

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: the visited nodes in order, source and
/// destination included, and the total travel time.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub total_minutes: f64,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() <= 1
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// Implementations must be `Send + Sync` so one router can serve concurrent
/// scheduling runs.
pub trait Router: Send + Sync {
    /// Compute a route from `from` to `to` over the directed or undirected
    /// view.  `from == to` is an empty route, not an error.
    fn route(
        &self,
        graph: &NetworkGraph,
        from: NodeId,
        to: NodeId,
        directed: bool,
    ) -> Result<Route, NetworkError>;

    /// Travel time in milliseconds from `from` to every node
    /// (`u32::MAX` for unreachable nodes).
    fn shortest_from(&self, graph: &NetworkGraph, from: NodeId, directed: bool) -> Vec<u32>;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Standard Dijkstra over the CSR adjacency, using `travel_ms` as cost.
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn route(
        &self,
        graph: &NetworkGraph,
        from: NodeId,
        to: NodeId,
        directed: bool,
    ) -> Result<Route, NetworkError> {
        if from == to {
            return Ok(Route { nodes: vec![from], total_minutes: 0.0 });
        }
        let (dist, prev) = dijkstra(graph, from, Some(to), directed);
        if dist[to.index()] == UNREACHED {
            return Err(NetworkError::NoRoute { from, to });
        }
        Ok(reconstruct(&prev, to, dist[to.index()]))
    }

    fn shortest_from(&self, graph: &NetworkGraph, from: NodeId, directed: bool) -> Vec<u32> {
        dijkstra(graph, from, None, directed).0
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Returns `(dist, prev)`.  Stops early once `target` is settled.
fn dijkstra(
    graph: &NetworkGraph,
    from: NodeId,
    target: Option<NodeId>,
    directed: bool,
) -> (Vec<u32>, Vec<NodeId>) {
    let n = graph.node_count();
    let mut dist = vec![UNREACHED; n];
    let mut prev = vec![NodeId::INVALID; n];
    if from.index() >= n {
        return (dist, prev);
    }
    dist[from.index()] = 0;

    // Min-heap: (cost, node). Secondary key NodeId ensures deterministic
    // tie-breaking.
    let mut heap: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if Some(node) == target {
            break;
        }
        // Skip stale heap entries.
        if cost > dist[node.index()] {
            continue;
        }
        for (neighbor, ms) in graph.neighbors_ms(node, directed) {
            let new_cost = cost.saturating_add(ms);
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev[neighbor.index()] = node;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }
    (dist, prev)
}

fn reconstruct(prev: &[NodeId], to: NodeId, total_ms: u32) -> Route {
    let mut nodes = vec![to];
    let mut cur = to;
    while prev[cur.index()] != NodeId::INVALID {
        cur = prev[cur.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    Route { nodes, total_minutes: total_ms as f64 / MS_PER_MINUTE }
}

// ── TravelMatrix ──────────────────────────────────────────────────────────────

/// All-pairs shortest travel times, computed once per scheduling run.
///
/// Stored row-major as milliseconds; `n` Dijkstra runs for `n` sites.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    n: usize,
    ms: Vec<u32>,
}

impl TravelMatrix {
    pub fn build<R: Router>(router: &R, graph: &NetworkGraph, directed: bool) -> Self {
        let n = graph.node_count();
        let mut ms = Vec::with_capacity(n * n);
        for i in 0..n {
            ms.extend(router.shortest_from(graph, NodeId(i as u32), directed));
        }
        Self { n, ms }
    }

    /// Shortest travel time in minutes, `None` if `to` is unreachable.
    #[inline]
    pub fn minutes(&self, from: NodeId, to: NodeId) -> Option<f64> {
        match self.ms[from.index() * self.n + to.index()] {
            UNREACHED => None,
            ms => Some(ms as f64 / MS_PER_MINUTE),
        }
    }

    /// Shortest travel time in whole milliseconds.
    #[inline]
    pub fn millis(&self, from: NodeId, to: NodeId) -> Option<u32> {
        match self.ms[from.index() * self.n + to.index()] {
            UNREACHED => None,
            ms => Some(ms),
        }
    }

    pub fn node_count(&self) -> usize {
        self.n
    }
}
