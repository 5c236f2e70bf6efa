//! report: end-to-end run of the cauldron_watch engine.
//!
//! ```text
//! report synthetic [--out DIR] [--config engine.json]
//! report run --sites cauldrons.json --levels levels.{csv,json} --tickets tickets.csv
//!            [--config engine.json] [--out DIR] [--at RFC3339] [--fixed]
//! ```
//!
//! Loads sites, telemetry and tickets, detects drains, reconciles them against
//! the ticket log, plans collection routes from the latest levels, and writes
//! the four report CSVs.  `RUST_LOG` controls log verbosity (default `info`).

mod input;
mod synthetic;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cw_core::EngineConfig;
use cw_network::NetworkBuilder;
use cw_output::{CsvReportWriter, EngineReport, write_report};
use cw_reconcile::{Classification, TicketBook, TicketReconciler, TicketRecord, load_tickets_csv};
use cw_schedule::{FleetOutcome, Forecaster, RouteScheduler};
use cw_telemetry::{TelemetryRecord, TelemetryStore, load_samples_csv};

use input::{Sites, load_sites, load_wide_levels};

const DEFAULT_OUT: &str = "output/report";

// ── Arguments ─────────────────────────────────────────────────────────────────

struct Args {
    command: String,
    flags:   BTreeMap<String, Option<String>>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut it = std::env::args().skip(1).peekable();
        let command = it.next().ok_or_else(|| anyhow!("usage: report <synthetic|run> [options]"))?;
        let mut flags = BTreeMap::new();
        while let Some(arg) = it.next() {
            let Some(name) = arg.strip_prefix("--") else {
                bail!("unexpected argument {arg:?}");
            };
            let value = match it.peek() {
                Some(v) if !v.starts_with("--") => it.next(),
                _ => None,
            };
            flags.insert(name.to_owned(), value);
        }
        Ok(Self { command, flags })
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        self.flags.get(name).cloned().flatten().map(PathBuf::from)
    }

    fn require(&self, name: &str) -> Result<PathBuf> {
        self.path(name).ok_or_else(|| anyhow!("--{name} <file> is required"))
    }

    fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", p.display()))?
        }
        None => EngineConfig::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn load_levels(path: &Path) -> Result<Vec<TelemetryRecord>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_wide_levels(path),
        _ => Ok(load_samples_csv(path)?),
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

struct Run {
    sites:     Sites,
    telemetry: Vec<TelemetryRecord>,
    tickets:   Vec<TicketRecord>,
    at:        Option<DateTime<Utc>>,
    fixed:     bool,
}

fn execute(run: Run, cfg: &EngineConfig, out: &Path) -> Result<EngineReport> {
    let Run { sites, telemetry, tickets, at, fixed } = run;

    // 1. Network.
    let mut b = NetworkBuilder::new();
    for r in &sites.reservoirs {
        b.add_reservoir(r)?;
    }
    b.add_depot(&sites.depot)?;
    for (from, to, minutes) in &sites.edges {
        b.add_edge(from.as_str(), to.as_str(), *minutes);
    }
    let (graph, warnings) = b.build_lenient();
    for w in &warnings {
        warn!(?w, "network edge dropped");
    }
    println!("Network: {} sites, {} edges", graph.node_count(), graph.edge_count(true));

    // 2. Telemetry and drain detection.
    let mut store = TelemetryStore::new(sites.reservoirs.iter().cloned(), cfg.detector.clone())?;
    let ingest = store.ingest_batch(telemetry);
    println!(
        "Telemetry: {} accepted, {} rejected, {} replaced",
        ingest.accepted,
        ingest.rejected.len(),
        ingest.replaced
    );
    let events = store.events_through_now();
    println!("Drain events: {}", events.len());

    // 3. Reconciliation.
    let mut book = TicketBook::new(sites.reservoirs.iter().map(|r| r.id.clone()));
    let rejected = book.add_batch(tickets);
    if !rejected.is_empty() {
        warn!(count = rejected.len(), "tickets rejected");
    }
    let reconciliation = TicketReconciler::new(cfg.reconcile.clone()).reconcile(book.tickets(), &events);

    // 4. Forecast and scheduling from the latest levels.
    let at = at
        .or_else(|| sites.reservoirs.iter().filter_map(|r| store.latest(&r.id)).map(|r| r.at).max())
        .unwrap_or_else(Utc::now);
    let snapshot = Forecaster::snapshot(&store, at);
    let scheduler = RouteScheduler::new(&graph, cfg.scheduler.clone())?;
    let outcome = if fixed {
        scheduler.plan_fixed_fleet(&snapshot, &sites.couriers)?
    } else {
        scheduler.plan_min_fleet(&snapshot, &sites.couriers)?
    };

    let report = EngineReport { events, reconciliation, schedule: Some(outcome) };
    let mut writer = CsvReportWriter::new(out)?;
    write_report(&mut writer, &report)?;
    Ok(report)
}

fn print_summary(report: &EngineReport, out: &Path) {
    let rec = &report.reconciliation;
    println!();
    println!("{:<16} {:>6}", "Classification", "Count");
    println!("{}", "-".repeat(23));
    for class in [Classification::Matched, Classification::UnderReported, Classification::OverReported] {
        println!("{:<16} {:>6}", class.as_str(), rec.count(class));
    }
    println!("{:<16} {:>6}", "UNLOGGED", rec.unlogged.len());
    println!();

    match &report.schedule {
        Some(FleetOutcome::Feasible(plan)) => {
            println!("Couriers required: {}", plan.required_courier_count);
            println!("{:<20} {:>6} {:>12}", "Courier", "Stops", "Collected");
            println!("{}", "-".repeat(40));
            for route in &plan.couriers {
                println!("{:<20} {:>6} {:>12.1}", route.courier.to_string(), route.stops.len(), route.collected());
            }
        }
        Some(FleetOutcome::Infeasible { max_fleet, overflow }) => {
            println!("No feasible schedule with up to {max_fleet} couriers");
            if let Some(o) = overflow {
                println!("  first overflow: {} at {}", o.site, o.at);
            }
        }
        None => {}
    }
    println!();
    println!("Reports written to {}", out.display());
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse()?;
    let cfg = load_config(args.path("config").as_deref())?;
    let out = args.path("out").unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));

    let run = match args.command.as_str() {
        "synthetic" => {
            let sites = synthetic::sites();
            let telemetry = synthetic::telemetry(&sites);
            Run { sites, telemetry, tickets: synthetic::tickets(), at: None, fixed: false }
        }
        "run" => {
            let sites = load_sites(&args.require("sites")?)?;
            let telemetry = load_levels(&args.require("levels")?)?;
            let tickets = load_tickets_csv(&args.require("tickets")?)?;
            let at = match args.flags.get("at").cloned().flatten() {
                Some(s) => Some(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc)),
                None => None,
            };
            Run { sites, telemetry, tickets, at, fixed: args.has("fixed") }
        }
        other => bail!("unknown command {other:?}; expected `synthetic` or `run`"),
    };

    println!("=== report: cauldron_watch ===");
    let t0 = Instant::now();
    let report = execute(run, &cfg, &out)?;
    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "run complete");
    print_summary(&report, &out);
    Ok(())
}
