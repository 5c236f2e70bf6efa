//! Site graph representation and builder.
//!
//! # Data layout
//!
//! Nodes are the reservoirs plus the depot, indexed by `NodeId` in the order
//! they were added.  Edges are held twice, both in **Compressed Sparse Row
//! (CSR)** form:
//!
//! - the **directed** view keeps every declared `(from, to)` pair;
//! - the **undirected** view adds the reverse of every edge that has no
//!   declared reverse.
//!
//! Given a `NodeId n`, its outgoing edges in either view occupy the slice
//!
//! ```text
//! edge_to[ out_start[n] .. out_start[n+1] ]
//! ```
//!
//! sorted by destination `NodeId`, so `neighbors()` order is deterministic.
//!
//! # Conflicting times
//!
//! Duplicate declarations of the same `(from, to)` pair keep the smaller
//! time.  When `a → b` and `b → a` are both declared with different times
//! the directed view keeps them distinct and the undirected view uses the
//! minimum of the two for both directions; the conflict is logged, never
//! fatal.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest site.  Used to
//! place couriers whose start is a reported position rather than a site.

use std::collections::{BTreeMap, HashMap};

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::warn;

use cw_core::{Depot, GeoPoint, NodeId, Reservoir, SiteId, DEFAULT_UNLOAD_MINUTES};

use crate::{NetworkError, NetworkResult};

const MS_PER_MINUTE: f64 = 60_000.0;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone)]
struct SiteEntry {
    point: [f64; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for SiteEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for SiteEntry {
    /// Squared Euclidean distance in lat/lon space.  Good enough to pick the
    /// nearest of a few dozen sites spread over a region.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── SiteKind ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SiteKind {
    Reservoir,
    Depot,
}

// ── Adjacency ─────────────────────────────────────────────────────────────────

/// One CSR edge set.
#[derive(Debug, Default)]
struct Adjacency {
    /// Length = `node_count + 1`.
    out_start: Vec<u32>,
    edge_to: Vec<NodeId>,
    /// Travel time in milliseconds.  Used as Dijkstra edge cost.
    edge_travel_ms: Vec<u32>,
}

impl Adjacency {
    /// Build from a `(from, to) → ms` map.  `BTreeMap` iteration order is
    /// already sorted by source then destination.
    fn from_pairs(node_count: usize, pairs: &BTreeMap<(NodeId, NodeId), u32>) -> Self {
        let mut out_start = vec![0u32; node_count + 1];
        let mut edge_to = Vec::with_capacity(pairs.len());
        let mut edge_travel_ms = Vec::with_capacity(pairs.len());

        for (&(from, to), &ms) in pairs {
            out_start[from.index() + 1] += 1;
            edge_to.push(to);
            edge_travel_ms.push(ms);
        }
        for i in 1..=node_count {
            out_start[i] += out_start[i - 1];
        }
        debug_assert_eq!(out_start[node_count] as usize, edge_to.len());

        Self { out_start, edge_to, edge_travel_ms }
    }

    #[inline]
    fn range(&self, node: NodeId) -> std::ops::Range<usize> {
        self.out_start[node.index()] as usize..self.out_start[node.index() + 1] as usize
    }
}

// ── NetworkGraph ──────────────────────────────────────────────────────────────

/// Static site graph with directed and undirected adjacency.
///
/// Do not construct directly; use [`NetworkBuilder`].  The graph never
/// changes after construction.
pub struct NetworkGraph {
    /// External id of each node.  Indexed by `NodeId`.
    pub site_ids: Vec<SiteId>,
    pub site_pos: Vec<GeoPoint>,
    pub site_kind: Vec<SiteKind>,

    index: HashMap<SiteId, NodeId>,
    directed: Adjacency,
    undirected: Adjacency,
    spatial_idx: RTree<SiteEntry>,
    unload_minutes: f64,
}

impl NetworkGraph {
    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.site_ids.len()
    }

    /// Number of edges in the chosen view.
    pub fn edge_count(&self, directed: bool) -> usize {
        self.adjacency(directed).edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.site_ids.is_empty()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn node(&self, site: &SiteId) -> Option<NodeId> {
        self.index.get(site).copied()
    }

    /// Like [`node`](Self::node) but failing with `SiteNotFound`.
    pub fn require(&self, site: &SiteId) -> NetworkResult<NodeId> {
        self.node(site).ok_or_else(|| NetworkError::SiteNotFound(site.clone()))
    }

    pub fn site_id(&self, node: NodeId) -> &SiteId {
        &self.site_ids[node.index()]
    }

    pub fn kind(&self, node: NodeId) -> SiteKind {
        self.site_kind[node.index()]
    }

    /// The depot node, if one was added.
    pub fn depot(&self) -> Option<NodeId> {
        self.site_kind
            .iter()
            .position(|k| *k == SiteKind::Depot)
            .map(|i| NodeId(i as u32))
    }

    /// Minutes a courier spends unloading at the depot.
    pub fn unload_minutes(&self) -> f64 {
        self.unload_minutes
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    #[inline]
    fn adjacency(&self, directed: bool) -> &Adjacency {
        if directed { &self.directed } else { &self.undirected }
    }

    /// Outgoing `(neighbor, travel_ms)` pairs of `node`, ascending by
    /// neighbor.  Contiguous slice scan, no heap allocation.
    #[inline]
    pub fn neighbors_ms(&self, node: NodeId, directed: bool) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        let adj = self.adjacency(directed);
        adj.range(node).map(move |i| (adj.edge_to[i], adj.edge_travel_ms[i]))
    }

    /// Outgoing `(neighbor, travel_minutes)` pairs of `node`, ascending by
    /// neighbor.
    pub fn neighbors(&self, node: NodeId, directed: bool) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.neighbors_ms(node, directed)
            .map(|(n, ms)| (n, ms as f64 / MS_PER_MINUTE))
    }

    /// [`neighbors`](Self::neighbors) keyed by external ids.
    pub fn neighbors_of(&self, site: &SiteId, directed: bool) -> NetworkResult<Vec<(SiteId, f64)>> {
        let node = self.require(site)?;
        Ok(self
            .neighbors(node, directed)
            .map(|(n, minutes)| (self.site_id(n).clone(), minutes))
            .collect())
    }

    /// Out-degree of `node` in the chosen view.
    #[inline]
    pub fn out_degree(&self, node: NodeId, directed: bool) -> usize {
        self.adjacency(directed).range(node).len()
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the nearest site to `pos`, or `None` if the graph is empty.
    pub fn snap_to_site(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }
}

// ── NetworkWarning ────────────────────────────────────────────────────────────

/// Non-fatal issue found while building in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkWarning {
    /// The edge was dropped because one endpoint is unknown.
    UnknownNode { from: SiteId, to: SiteId, missing: SiteId },
    /// The edge was dropped because its time is negative or not finite.
    InvalidTravelTime { from: SiteId, to: SiteId, minutes: f64 },
}

// ── NetworkBuilder ────────────────────────────────────────────────────────────

/// Construct a [`NetworkGraph`] incrementally, then call
/// [`build`](Self::build) (strict) or [`build_lenient`](Self::build_lenient).
///
/// Sites must be added before `build`; edges may reference sites in any
/// order because they are resolved at build time.
///
/// # Example
///
/// ```
/// use cw_core::GeoPoint;
/// use cw_network::{NetworkBuilder, SiteKind};
///
/// let mut b = NetworkBuilder::new();
/// b.add_site("cauldron_001", GeoPoint::new(33.70, -84.40), SiteKind::Reservoir).unwrap();
/// b.add_site("market_001", GeoPoint::new(33.75, -84.39), SiteKind::Depot).unwrap();
/// b.add_edge("cauldron_001", "market_001", 12.0);
/// let net = b.build().unwrap();
/// assert_eq!(net.edge_count(true), 1);
/// assert_eq!(net.edge_count(false), 2); // reverse derived
/// ```
#[derive(Default)]
pub struct NetworkBuilder {
    ids: Vec<SiteId>,
    pos: Vec<GeoPoint>,
    kinds: Vec<SiteKind>,
    index: HashMap<SiteId, NodeId>,
    raw_edges: Vec<RawEdge>,
    unload_minutes: Option<f64>,
}

struct RawEdge {
    from: SiteId,
    to: SiteId,
    minutes: f64,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a site and return its `NodeId` (sequential from 0).  At most one
    /// site may be the depot.
    pub fn add_site(&mut self, id: impl Into<SiteId>, pos: GeoPoint, kind: SiteKind) -> NetworkResult<NodeId> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(NetworkError::DuplicateSite(id));
        }
        if kind == SiteKind::Depot {
            if let Some(i) = self.kinds.iter().position(|k| *k == SiteKind::Depot) {
                return Err(NetworkError::SecondDepot { existing: self.ids[i].clone(), rejected: id });
            }
        }
        let node = NodeId(self.ids.len() as u32);
        self.index.insert(id.clone(), node);
        self.ids.push(id);
        self.pos.push(pos);
        self.kinds.push(kind);
        Ok(node)
    }

    pub fn add_reservoir(&mut self, r: &Reservoir) -> NetworkResult<NodeId> {
        r.validate()?;
        self.add_site(r.id.clone(), r.location, SiteKind::Reservoir)
    }

    /// Add the depot along with its unload duration.  A depot added through
    /// [`add_site`](Self::add_site) unloads in `DEFAULT_UNLOAD_MINUTES`.
    pub fn add_depot(&mut self, d: &Depot) -> NetworkResult<NodeId> {
        d.validate()?;
        let node = self.add_site(d.id.clone(), d.location, SiteKind::Depot)?;
        self.unload_minutes = Some(d.unload_minutes);
        Ok(node)
    }

    /// Declare a **directed** edge.  Validated at build time.
    pub fn add_edge(&mut self, from: impl Into<SiteId>, to: impl Into<SiteId>, travel_minutes: f64) {
        self.raw_edges.push(RawEdge { from: from.into(), to: to.into(), minutes: travel_minutes });
    }

    pub fn node_count(&self) -> usize { self.ids.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder, failing on the first edge that references an
    /// unknown site or carries an invalid time.
    pub fn build(self) -> NetworkResult<NetworkGraph> {
        let (graph, warnings) = self.assemble();
        match warnings.into_iter().next() {
            None => Ok(graph),
            Some(NetworkWarning::UnknownNode { from, to, missing }) => {
                Err(NetworkError::UnknownNode { from, to, missing })
            }
            Some(NetworkWarning::InvalidTravelTime { from, to, minutes }) => {
                Err(NetworkError::InvalidTravelTime { from, to, minutes })
            }
        }
    }

    /// Consume the builder, dropping bad edges and returning them as
    /// warnings.  Unrelated sites stay routable.
    pub fn build_lenient(self) -> (NetworkGraph, Vec<NetworkWarning>) {
        let (graph, warnings) = self.assemble();
        for w in &warnings {
            warn!(warning = ?w, "edge rejected");
        }
        (graph, warnings)
    }

    fn assemble(self) -> (NetworkGraph, Vec<NetworkWarning>) {
        let node_count = self.ids.len();
        let mut warnings = Vec::new();

        // ── Resolve and deduplicate declared edges ────────────────────────
        let mut directed: BTreeMap<(NodeId, NodeId), u32> = BTreeMap::new();
        for e in self.raw_edges {
            let missing = [&e.from, &e.to].into_iter().find(|id| !self.index.contains_key(*id));
            if let Some(missing) = missing {
                warnings.push(NetworkWarning::UnknownNode {
                    missing: missing.clone(),
                    from: e.from,
                    to: e.to,
                });
                continue;
            }
            let ms = e.minutes * MS_PER_MINUTE;
            if !(ms.is_finite() && ms >= 0.0 && ms <= u32::MAX as f64) {
                warnings.push(NetworkWarning::InvalidTravelTime { from: e.from, to: e.to, minutes: e.minutes });
                continue;
            }
            let ms = ms.round() as u32;
            let key = (self.index[&e.from], self.index[&e.to]);
            directed
                .entry(key)
                .and_modify(|cur| {
                    if *cur != ms {
                        warn!(from = %e.from, to = %e.to, kept_ms = (*cur).min(ms), "duplicate edge with different times");
                    }
                    *cur = (*cur).min(ms);
                })
                .or_insert(ms);
        }

        // ── Derive the undirected view ────────────────────────────────────
        let mut undirected: BTreeMap<(NodeId, NodeId), u32> = BTreeMap::new();
        for (&(a, b), &ms) in &directed {
            if let Some(&rev) = directed.get(&(b, a)) {
                if rev != ms && a < b {
                    warn!(
                        a = %self.ids[a.index()],
                        b = %self.ids[b.index()],
                        forward_ms = ms,
                        reverse_ms = rev,
                        "asymmetric travel times; undirected view uses the minimum",
                    );
                }
            }
            for key in [(a, b), (b, a)] {
                undirected
                    .entry(key)
                    .and_modify(|cur| *cur = (*cur).min(ms))
                    .or_insert(ms);
            }
        }

        // ── Spatial index ─────────────────────────────────────────────────
        let entries: Vec<SiteEntry> = self
            .pos
            .iter()
            .enumerate()
            .map(|(i, p)| SiteEntry { point: [p.lat, p.lon], id: NodeId(i as u32) })
            .collect();

        let graph = NetworkGraph {
            directed: Adjacency::from_pairs(node_count, &directed),
            undirected: Adjacency::from_pairs(node_count, &undirected),
            site_ids: self.ids,
            site_pos: self.pos,
            site_kind: self.kinds,
            index: self.index,
            spatial_idx: RTree::bulk_load(entries),
            unload_minutes: self.unload_minutes.unwrap_or(DEFAULT_UNLOAD_MINUTES),
        };
        (graph, warnings)
    }
}
