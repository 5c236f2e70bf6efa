//! Built-in synthetic deployment.
//!
//! Four reservoirs around one market, one day of minute-resolution telemetry
//! with one courier visit to three of them, and a ticket log with a
//! matched, an under-reported, a missing and a phantom ticket.

use chrono::{DateTime, TimeZone, Utc};

use cw_core::{Depot, GeoPoint, Reservoir};
use cw_reconcile::TicketRecord;
use cw_telemetry::{InjectedDrain, SyntheticSeries, TelemetryRecord};

use crate::input::Sites;

const MINUTES:    u32 = 1_440;
const FILL_RATE:  f64 = 0.5;
const MAX_VOLUME: f64 = 1_000.0;
const SEED:       u64 = 42;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).single().unwrap_or_default()
}

pub fn sites() -> Sites {
    let reservoir = |id: &str, lat: f64, lon: f64| {
        Reservoir::new(id, id, GeoPoint::new(lat, lon), MAX_VOLUME).with_fill_rate(FILL_RATE)
    };
    let reservoirs = vec![
        reservoir("cauldron_001", 33.2148, -97.1331),
        reservoir("cauldron_002", 33.2155, -97.1298),
        reservoir("cauldron_003", 33.2109, -97.1354),
        reservoir("cauldron_004", 33.2187, -97.1362),
    ];
    let depot = Depot::new("market_001", "Enchanted Market", GeoPoint::new(33.2145, -97.1332));

    let edge = |a: &str, b: &str, m: f64| (a.to_owned(), b.to_owned(), m);
    let edges = vec![
        edge("market_001", "cauldron_001", 12.0),
        edge("market_001", "cauldron_002", 18.0),
        edge("market_001", "cauldron_003", 25.0),
        edge("cauldron_001", "cauldron_004", 20.0),
        edge("cauldron_002", "cauldron_003", 15.0),
    ];

    Sites { reservoirs, depot, edges, couriers: Vec::new() }
}

/// Each reservoir starts at 200 and is drained once, staggered by two hours.
/// `cauldron_004` is left untouched.
pub fn telemetry(sites: &Sites) -> Vec<TelemetryRecord> {
    let mut records = Vec::new();
    for (i, r) in sites.reservoirs.iter().enumerate() {
        let mut series = SyntheticSeries::new(start(), MINUTES, 200.0, FILL_RATE)
            .with_noise(0.02, SEED + i as u64)
            .with_max_volume(r.max_volume);
        if i < 3 {
            series = series.with_drain(InjectedDrain {
                start_minute: 480 + 120 * i as u32,
                duration_minutes: 8,
                removal_per_minute: 60.0,
            });
        }
        records.extend(series.records(&r.id));
    }
    records
}

pub fn tickets() -> Vec<TicketRecord> {
    vec![
        TicketRecord::new("cauldron_001", "2024-01-05", 480.0).with_ticket_id("TT_20240105_001"),
        TicketRecord::new("cauldron_002", "2024-01-05", 400.0).with_ticket_id("TT_20240105_002"),
        TicketRecord::new("cauldron_004", "2024-01-05", 150.0).with_ticket_id("TT_20240105_003"),
    ]
}
