//! JSON input shapes accepted by the demo.
//!
//! The site file looks like this:
//!
//! ```json
//! { "cauldrons": [{ "id": "cauldron_001", "name": "…", "latitude": 0.0, "longitude": 0.0,
//!                   "max_volume": 1000, "fill_rate": 0.5 }],
//!   "market":    { "id": "market_001", "name": "…", "latitude": 0.0, "longitude": 0.0 },
//!   "network":   { "edges": [{ "from": "cauldron_001", "to": "market_001", "travel_time_minutes": 15 }] },
//!   "couriers":  [{ "courier_id": "courier_witch_01", "max_carrying_capacity": 100 }] }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use cw_core::{CourierSpec, Depot, GeoPoint, Reservoir};
use cw_telemetry::TelemetryRecord;

#[derive(Deserialize)]
struct SiteDto {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
}

#[derive(Deserialize)]
struct ReservoirDto {
    #[serde(flatten)]
    site: SiteDto,
    max_volume: f64,
    fill_rate: Option<f64>,
    drain_rate: Option<f64>,
}

#[derive(Deserialize)]
struct EdgeDto {
    from: String,
    to: String,
    travel_time_minutes: f64,
}

#[derive(Deserialize, Default)]
struct NetworkDto {
    #[serde(default)]
    edges: Vec<EdgeDto>,
}

#[derive(Deserialize)]
struct CourierDto {
    courier_id: String,
    max_carrying_capacity: Option<f64>,
}

#[derive(Deserialize)]
struct SiteFile {
    cauldrons: Vec<ReservoirDto>,
    market: SiteDto,
    #[serde(default)]
    network: NetworkDto,
    #[serde(default)]
    couriers: Vec<CourierDto>,
    unload_minutes: Option<f64>,
}

/// Everything static about one deployment.
pub struct Sites {
    pub reservoirs: Vec<Reservoir>,
    pub depot: Depot,
    /// `(from, to, travel_minutes)`.
    pub edges: Vec<(String, String, f64)>,
    pub couriers: Vec<CourierSpec>,
}

pub fn load_sites(path: &Path) -> Result<Sites> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let raw: SiteFile =
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))?;

    let reservoirs = raw
        .cauldrons
        .into_iter()
        .map(|c| {
            let mut r = Reservoir::new(
                c.site.id,
                c.site.name,
                GeoPoint::new(c.site.latitude, c.site.longitude),
                c.max_volume,
            );
            r.fill_rate = c.fill_rate;
            r.drain_rate = c.drain_rate;
            r
        })
        .collect();

    let mut depot = Depot::new(raw.market.id, raw.market.name, GeoPoint::new(raw.market.latitude, raw.market.longitude));
    if let Some(m) = raw.unload_minutes {
        depot.unload_minutes = m;
    }

    let edges = raw.network.edges.into_iter().map(|e| (e.from, e.to, e.travel_time_minutes)).collect();

    let couriers = raw
        .couriers
        .into_iter()
        .map(|c| {
            let spec = CourierSpec::new(c.courier_id);
            match c.max_carrying_capacity {
                Some(cap) => spec.with_capacity(cap),
                None => spec,
            }
        })
        .collect();

    Ok(Sites { reservoirs, depot, edges, couriers })
}

#[derive(Deserialize)]
struct WideRow {
    timestamp: String,
    cauldron_levels: std::collections::BTreeMap<String, Option<f64>>,
}

/// Flatten a wide level history (`[{timestamp, cauldron_levels: {id: level}}]`)
/// into one record per reservoir and instant.
pub fn load_wide_levels(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let rows: Vec<WideRow> =
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))?;

    let mut records = Vec::new();
    for row in rows {
        for (id, level) in row.cauldron_levels {
            records.push(TelemetryRecord {
                reservoir_id: Some(id),
                timestamp: Some(row.timestamp.clone()),
                volume: level,
            });
        }
    }
    Ok(records)
}
