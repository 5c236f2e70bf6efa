//! Unit tests for cw-network.
//!
//! All tests use hand-crafted networks.

#[cfg(test)]
mod helpers {
    use cw_core::GeoPoint;

    use crate::{NetworkBuilder, NetworkGraph, SiteKind};

    /// Five sites, undirected edges declared one way only.
    ///
    /// ```text
    ///   market ─10─ c1 ─10─ c2
    ///     │                  │
    ///    50                 10
    ///     │                  │
    ///    c3 ───────10─────── c4
    /// ```
    ///
    /// Shortest market→c4 is market→c1→c2→c4 (30 min) rather than
    /// market→c3→c4 (60 min).
    pub fn ring() -> NetworkGraph {
        let mut b = NetworkBuilder::new();
        b.add_site("market", GeoPoint::new(0.0, 0.0), SiteKind::Depot).unwrap();
        b.add_site("c1", GeoPoint::new(0.0, 1.0), SiteKind::Reservoir).unwrap();
        b.add_site("c2", GeoPoint::new(0.0, 2.0), SiteKind::Reservoir).unwrap();
        b.add_site("c3", GeoPoint::new(1.0, 0.0), SiteKind::Reservoir).unwrap();
        b.add_site("c4", GeoPoint::new(1.0, 2.0), SiteKind::Reservoir).unwrap();

        b.add_edge("market", "c1", 10.0);
        b.add_edge("c1", "c2", 10.0);
        b.add_edge("c2", "c4", 10.0);
        b.add_edge("market", "c3", 50.0);
        b.add_edge("c3", "c4", 10.0);
        b.build().unwrap()
    }
}

// ── Builder & adjacency ───────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use cw_core::{Depot, GeoPoint, SiteId, DEFAULT_UNLOAD_MINUTES};

    use crate::{NetworkBuilder, NetworkError, NetworkWarning, SiteKind};

    fn two_sites() -> NetworkBuilder {
        let mut b = NetworkBuilder::new();
        b.add_site("A", GeoPoint::new(0.0, 0.0), SiteKind::Reservoir).unwrap();
        b.add_site("B", GeoPoint::new(0.0, 1.0), SiteKind::Depot).unwrap();
        b
    }

    #[test]
    fn empty_build() {
        let net = NetworkBuilder::new().build().unwrap();
        assert!(net.is_empty());
        assert_eq!(net.edge_count(true), 0);
        assert_eq!(net.depot(), None);
    }

    #[test]
    fn undirected_view_adds_missing_reverse() {
        let mut b = two_sites();
        b.add_edge("A", "B", 12.0);
        let net = b.build().unwrap();

        let a = SiteId::new("a");
        let bb = SiteId::new("b");
        assert_eq!(net.neighbors_of(&a, true).unwrap(), vec![(bb.clone(), 12.0)]);
        assert!(net.neighbors_of(&bb, true).unwrap().is_empty());
        assert_eq!(net.neighbors_of(&bb, false).unwrap(), vec![(a, 12.0)]);
    }

    #[test]
    fn asymmetric_times_use_minimum_when_undirected() {
        let mut b = two_sites();
        b.add_edge("A", "B", 12.0);
        b.add_edge("B", "A", 8.0);
        let net = b.build().unwrap();

        let a = net.node(&SiteId::new("A")).unwrap();
        let bb = net.node(&SiteId::new("B")).unwrap();

        // Directed view keeps both declared times.
        assert_eq!(net.neighbors(a, true).collect::<Vec<_>>(), vec![(bb, 12.0)]);
        assert_eq!(net.neighbors(bb, true).collect::<Vec<_>>(), vec![(a, 8.0)]);
        // Undirected view is symmetric at the minimum.
        assert_eq!(net.neighbors(a, false).collect::<Vec<_>>(), vec![(bb, 8.0)]);
        assert_eq!(net.neighbors(bb, false).collect::<Vec<_>>(), vec![(a, 8.0)]);
        assert_eq!(net.edge_count(false), 2);
    }

    #[test]
    fn duplicate_declaration_keeps_shorter_time() {
        let mut b = two_sites();
        b.add_edge("A", "B", 12.0);
        b.add_edge("a", "b", 9.0);
        let net = b.build().unwrap();
        assert_eq!(net.edge_count(true), 1);
        let a = net.node(&SiteId::new("a")).unwrap();
        assert_eq!(net.neighbors(a, true).next().unwrap().1, 9.0);
    }

    #[test]
    fn unknown_node_fails_strict_build() {
        let mut b = two_sites();
        b.add_edge("A", "ghost", 5.0);
        match b.build() {
            Err(NetworkError::UnknownNode { missing, .. }) => assert_eq!(missing.as_str(), "ghost"),
            other => panic!("expected UnknownNode, got {:?}", other.err()),
        }
    }

    #[test]
    fn lenient_build_drops_bad_edges_only() {
        let mut b = two_sites();
        b.add_edge("A", "ghost", 5.0);
        b.add_edge("A", "B", -1.0);
        b.add_edge("B", "A", 3.0);
        let (net, warnings) = b.build_lenient();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], NetworkWarning::UnknownNode { .. }));
        assert!(matches!(warnings[1], NetworkWarning::InvalidTravelTime { .. }));
        assert_eq!(net.edge_count(true), 1);
        assert_eq!(net.edge_count(false), 2);
    }

    #[test]
    fn duplicate_site_rejected() {
        let mut b = two_sites();
        let err = b.add_site("a", GeoPoint::new(5.0, 5.0), SiteKind::Reservoir).unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateSite(_)));
    }

    #[test]
    fn second_depot_rejected() {
        let mut b = two_sites();
        let err = b.add_site("C", GeoPoint::new(1.0, 1.0), SiteKind::Depot).unwrap_err();
        assert!(matches!(
            &err,
            NetworkError::SecondDepot { existing, rejected }
                if existing == &SiteId::new("B") && rejected == &SiteId::new("C")
        ));

        let err = b.add_depot(&Depot::new("D", "Other market", GeoPoint::new(2.0, 2.0))).unwrap_err();
        assert!(matches!(err, NetworkError::SecondDepot { .. }));

        // Neither rejected site was added.
        let net = b.build().unwrap();
        assert_eq!(net.node_count(), 2);
        assert_eq!(net.site_id(net.depot().unwrap()), &SiteId::new("B"));
    }

    #[test]
    fn depot_unload_duration_kept() {
        let net = two_sites().build().unwrap();
        assert_eq!(net.unload_minutes(), DEFAULT_UNLOAD_MINUTES);

        let mut b = NetworkBuilder::new();
        let mut depot = Depot::new("market", "Market", GeoPoint::new(0.0, 0.0));
        depot.unload_minutes = 30.0;
        b.add_depot(&depot).unwrap();
        assert_eq!(b.build().unwrap().unload_minutes(), 30.0);
    }

    #[test]
    fn neighbors_sorted_by_node() {
        let net = super::helpers::ring();
        let market = net.node(&SiteId::new("market")).unwrap();
        let ns: Vec<_> = net.neighbors(market, false).map(|(n, _)| n).collect();
        let mut sorted = ns.clone();
        sorted.sort();
        assert_eq!(ns, sorted);
        assert_eq!(net.out_degree(market, false), 2);
        assert_eq!(net.depot(), Some(market));
    }
}

// ── Spatial snap ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use cw_core::{GeoPoint, SiteId};

    #[test]
    fn nearest_site() {
        let net = super::helpers::ring();
        let n = net.snap_to_site(GeoPoint::new(0.9, 2.1)).unwrap();
        assert_eq!(net.site_id(n), &SiteId::new("c4"));
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use cw_core::SiteId;

    use crate::{DijkstraRouter, NetworkError, Router, TravelMatrix};

    #[test]
    fn shortest_path_prefers_faster_roads() {
        let net = super::helpers::ring();
        let m = net.node(&SiteId::new("market")).unwrap();
        let c4 = net.node(&SiteId::new("c4")).unwrap();
        let route = DijkstraRouter.route(&net, m, c4, false).unwrap();
        assert_eq!(route.total_minutes, 30.0);
        let ids: Vec<_> = route.nodes.iter().map(|n| net.site_id(*n).as_str()).collect();
        assert_eq!(ids, ["market", "c1", "c2", "c4"]);
    }

    #[test]
    fn same_node_is_trivial() {
        let net = super::helpers::ring();
        let m = net.node(&SiteId::new("market")).unwrap();
        let route = DijkstraRouter.route(&net, m, m, false).unwrap();
        assert!(route.is_trivial());
        assert_eq!(route.total_minutes, 0.0);
    }

    #[test]
    fn directed_view_can_be_disconnected() {
        let net = super::helpers::ring();
        let m = net.node(&SiteId::new("market")).unwrap();
        let c4 = net.node(&SiteId::new("c4")).unwrap();
        // Edges were declared market-outward only.
        assert!(matches!(
            DijkstraRouter.route(&net, c4, m, true),
            Err(NetworkError::NoRoute { .. })
        ));
        assert!(DijkstraRouter.route(&net, m, c4, true).is_ok());
    }

    #[test]
    fn matrix_matches_router() {
        let net = super::helpers::ring();
        let matrix = TravelMatrix::build(&DijkstraRouter, &net, false);
        let m = net.node(&SiteId::new("market")).unwrap();
        let c3 = net.node(&SiteId::new("c3")).unwrap();
        let c4 = net.node(&SiteId::new("c4")).unwrap();
        assert_eq!(matrix.minutes(m, c4), Some(30.0));
        assert_eq!(matrix.millis(m, c4), Some(1_800_000));
        // market→c3 direct is 50, via c1-c2-c4-c3 is 40.
        assert_eq!(matrix.minutes(m, c3), Some(40.0));
        assert_eq!(matrix.minutes(c3, c3), Some(0.0));

        let directed = TravelMatrix::build(&DijkstraRouter, &net, true);
        assert_eq!(directed.minutes(c4, m), None);
    }
}
