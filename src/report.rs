//! Plain-text and JSON rendering of aggregation bundles.
//!
//! The `run_*` functions are the CLI entry points: each runs one
//! aggregation and prints it to stdout, as JSON when `--json` is given.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt::Write;

use crate::aggregate::{
    Aggregator, CircuitGalleryBundle, DashboardBundle, DriverDetailBundle, StandingsBundle,
};
use crate::models::CircuitRecord;
use crate::views::{ScreenView, TrackExplorerView};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run_dashboard(aggregator: &Aggregator, json: bool) -> Result<()> {
    let bundle = aggregator.dashboard().await;
    if json {
        return print_json(&bundle);
    }
    print!("{}", render_dashboard(&bundle));
    Ok(())
}

pub async fn run_standings(aggregator: &Aggregator, json: bool) -> Result<()> {
    let bundle = aggregator.standings().await;
    if json {
        return print_json(&bundle);
    }
    print!("{}", render_standings(&bundle));
    Ok(())
}

pub async fn run_circuits(aggregator: &Aggregator, json: bool) -> Result<()> {
    let circuits = aggregator.circuits().await;
    if json {
        return print_json(&circuits);
    }
    print!("{}", render_circuits(&circuits));
    Ok(())
}

pub async fn run_circuit(aggregator: &Aggregator, circuit_id: &str, json: bool) -> Result<()> {
    let Some(bundle) = aggregator.circuit_gallery(circuit_id).await else {
        bail!("circuit not found: {}", circuit_id);
    };
    if json {
        return print_json(&bundle);
    }
    print!("{}", render_gallery(&bundle));
    Ok(())
}

pub async fn run_driver(aggregator: &Aggregator, driver_id: &str, json: bool) -> Result<()> {
    let Some(driver) = aggregator.find_driver(driver_id).await else {
        bail!("driver not found in current standings: {}", driver_id);
    };
    let bundle = aggregator.driver_details(driver).await;
    if json {
        return print_json(&bundle);
    }
    print!("{}", render_driver(&bundle));
    Ok(())
}

pub async fn run_track(aggregator: &Aggregator, circuit_id: &str, json: bool) -> Result<()> {
    let Some(circuit) = aggregator.find_circuit(circuit_id).await else {
        bail!("circuit not found: {}", circuit_id);
    };
    let view = aggregator.track_explorer(circuit).await;
    if json {
        return print_json(&view);
    }
    print!("{}", render_track(&view));
    Ok(())
}

pub fn render_dashboard(bundle: &DashboardBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Next Race ---");
    match &bundle.next_race {
        Some(race) => {
            let _ = writeln!(out, "{} {}", race.flag, race.name);
            let _ = writeln!(out, "location:     {}", race.location);
            let _ = writeln!(out, "date:         {}", race.date);
            if let Some(days) = bundle.days_until_race {
                let _ = writeln!(out, "days to go:   {}", days);
            }
            let _ = writeln!(out, "image:        {}", race.circuit_image);
        }
        None => {
            let _ = writeln!(out, "(no upcoming race)");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Championship Leaders ---");
    for driver in &bundle.top_drivers {
        let _ = writeln!(
            out,
            "{:>2}. {:<24} {:<20} {:>6} pts",
            driver.rank, driver.name, driver.team, driver.points
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Analysis ---");
    let _ = writeln!(out, "{}", bundle.analysis.trim());
    out
}

pub fn render_standings(bundle: &StandingsBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Drivers ---");
    if bundle.drivers.is_empty() {
        let _ = writeln!(out, "(unavailable)");
    }
    for d in &bundle.drivers {
        let _ = writeln!(
            out,
            "{:>2}. {:<24} {:<4} {:<20} {:>6} pts  {:>2} wins  [{}]",
            d.rank, d.name, d.country, d.team, d.points, d.wins, d.id
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Constructors ---");
    if bundle.teams.is_empty() {
        let _ = writeln!(out, "(unavailable)");
    }
    for t in &bundle.teams {
        let _ = writeln!(out, "{:>2}. {:<24} {:>6} pts", t.rank, t.name, t.points);
    }
    out
}

pub fn render_circuits(circuits: &[CircuitRecord]) -> String {
    let mut out = String::new();
    if circuits.is_empty() {
        let _ = writeln!(out, "No circuits available.");
        return out;
    }
    for c in circuits {
        let _ = writeln!(out, "{:<16} {:<40} {}", c.id, c.name, c.location);
    }
    out
}

pub fn render_gallery(bundle: &CircuitGalleryBundle) -> String {
    let mut out = String::new();
    let c = &bundle.circuit;
    let _ = writeln!(out, "--- {} ---", c.name);
    let _ = writeln!(out, "location:     {}", c.location);
    if let Some(image) = &c.image {
        let _ = writeln!(out, "image:        {}", image);
    }
    let _ = writeln!(out);

    let r = &bundle.records;
    let _ = writeln!(out, "--- Records ---");
    if !r.available {
        let _ = writeln!(out, "(AI records unavailable)");
    }
    let _ = writeln!(
        out,
        "lap record:   {} by {} ({})",
        r.lap_record_time, r.lap_record_driver, r.lap_record_year
    );
    let _ = writeln!(out, "most wins:    {} ({})", r.most_wins_driver, r.most_wins_count);
    let _ = writeln!(out, "{}", r.description);
    let _ = writeln!(out);

    let _ = writeln!(out, "--- Last Race ---");
    match &bundle.last_race {
        Some(race) => {
            let _ = writeln!(out, "{} {} ({})", race.season, race.race_name, race.date);
            for e in &race.results {
                let _ = writeln!(
                    out,
                    "{:>3} {:<4} {:<24} {:<20} {:<14} {:>4}",
                    e.position, e.driver_code, e.driver_name, e.constructor, e.time, e.points
                );
            }
        }
        None => {
            let _ = writeln!(out, "(no results)");
        }
    }
    out
}

pub fn render_driver(bundle: &DriverDetailBundle) -> String {
    let mut out = String::new();
    let d = &bundle.driver;
    let _ = writeln!(out, "--- {} ---", d.name);
    let _ = writeln!(out, "team:         {}", d.team);
    let _ = writeln!(out, "position:     P{}", d.rank);
    let _ = writeln!(out, "points:       {}", d.points);
    let _ = writeln!(out, "wins:         {}", d.wins);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Season Results ---");
    if bundle.results.is_empty() {
        let _ = writeln!(out, "(no results)");
    }
    for r in &bundle.results {
        let _ = writeln!(
            out,
            "R{:<3} {:<28} grid {:>2}  finish {:>2}  {:>4} pts  {}",
            r.round, r.race_name, r.grid, r.position, r.points, r.status
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Analysis ---");
    let _ = writeln!(out, "{}", bundle.analysis.trim());
    out
}

pub fn render_track(view: &TrackExplorerView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- {} ---", view.circuit.name);
    let _ = writeln!(out, "location:     {}", view.circuit.location);
    match &view.image {
        Some(image) => {
            let _ = writeln!(out, "image:        {}", image);
        }
        None => {
            let _ = writeln!(out, "image:        (loading)");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Intelligence Report ---");
    match &view.report {
        Some(report) => {
            let _ = writeln!(out, "{}", report.trim());
        }
        None => {
            let _ = writeln!(out, "(loading)");
        }
    }
    if !view.links.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Sources ---");
        for link in &view.links {
            let _ = writeln!(out, "- {}: {}", link.title, link.uri);
        }
    }
    out
}

pub fn render_view(view: &ScreenView) -> String {
    match view {
        ScreenView::Loading(screen) => format!("Loading {:?}...\n", screen),
        ScreenView::Dashboard(b) => render_dashboard(b),
        ScreenView::Standings(b) => render_standings(b),
        ScreenView::Circuits(c) => render_circuits(c),
        ScreenView::Gallery(b) => render_gallery(b),
        ScreenView::Driver(b) => render_driver(b),
        ScreenView::Track(v) => render_track(v),
        ScreenView::NotFound(what) => format!("Not found: {}\n", what),
    }
}
