// crates/cli/src/commands.rs
//! Subcommand bodies. Each returns the text to print so it can be tested
//! without capturing stdout.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use fieldops_automation::triggers::{Invoices, Messages, Quotes, WatchedCollection};
use fieldops_automation::{
    build_regions, jobs_for_day, AutomationConfig, CollectionWatch, EvalContext, FixedLocation, Notification,
    PlanOutcome, RouteSession,
};
use fieldops_core::{maps, Client, ClientIndex, Coordinate, DisplayDistance, Invoice, Job, Message, Quote};

/// Plan a route and describe it. With `json`, the plan itself is printed.
pub async fn plan(
    jobs: &[Job],
    clients: Vec<Client>,
    start: Option<Coordinate>,
    config: &AutomationConfig,
    json: bool,
) -> Result<String> {
    let directory: ClientIndex = clients.into_iter().collect();
    let session = RouteSession::new(Arc::new(FixedLocation(start)), config);

    let summary = match session.plan_route(jobs, &directory).await {
        PlanOutcome::Applied(summary) => summary,
        PlanOutcome::Superseded { generation } => anyhow::bail!("plan {generation} was superseded"),
    };
    let plan = session.plan();
    if json {
        return Ok(serde_json::to_string_pretty(&plan)?);
    }

    let mut out = String::new();
    writeln!(
        out,
        "Route: {} stops, {} total ({} unroutable)",
        summary.stops,
        DisplayDistance::from_km(summary.total_distance_km),
        summary.unroutable
    )?;
    if let Some(start) = summary.start {
        writeln!(out, "Start: {start}")?;
    }
    for stop in plan.stops() {
        writeln!(
            out,
            "{:>3}. {:<32} {:>9}  {}",
            stop.route_order + 1,
            stop.job.display_title(),
            DisplayDistance::from_km(stop.distance_from_prev_km).to_string(),
            stop.coordinate
        )?;
    }
    if let Some(url) = maps::directions_url(&plan.coordinates()) {
        writeln!(out, "Directions: {url}")?;
    }
    Ok(out)
}

/// Regions that would be monitored for `day` in `tz`.
pub fn regions<Tz: TimeZone>(
    jobs: &[Job],
    clients: Vec<Client>,
    day: NaiveDate,
    tz: &Tz,
    config: &AutomationConfig,
) -> Result<String> {
    let directory: ClientIndex = clients.into_iter().collect();
    let candidates = jobs_for_day(jobs, day, tz);
    let (regions, unresolvable) = build_regions(&candidates, &directory, config.geofence_radius_m);

    let mut out = String::new();
    writeln!(
        out,
        "{day}: {} regions from {} jobs ({unresolvable} unresolvable)",
        regions.len(),
        candidates.len()
    )?;
    for region in &regions {
        writeln!(
            out,
            "  {:<16} {}  r={}m  {}",
            region.identifier,
            region.center,
            region.radius_meters,
            maps::place_url(region.center, &region.identifier)
        )?;
    }
    Ok(out)
}

/// Feed `snapshots` through a fresh watch and collect what it emits.
///
/// The first snapshot only sets the baseline; there is no warm-up window
/// after that.
pub fn replay<C: WatchedCollection>(snapshots: &[Vec<C::Item>], config: &AutomationConfig) -> Vec<Notification> {
    let mut watch = CollectionWatch::<C>::new(Duration::ZERO, EvalContext::from(config));
    snapshots.iter().flat_map(|snapshot| watch.observe(snapshot)).collect()
}

pub fn replay_quotes(snapshots: &[Vec<Quote>], config: &AutomationConfig) -> Vec<Notification> {
    replay::<Quotes>(snapshots, config)
}

pub fn replay_invoices(snapshots: &[Vec<Invoice>], config: &AutomationConfig) -> Vec<Notification> {
    replay::<Invoices>(snapshots, config)
}

pub fn replay_messages(snapshots: &[Vec<Message>], config: &AutomationConfig) -> Vec<Notification> {
    replay::<Messages>(snapshots, config)
}

/// One JSON object per line.
pub fn render_notifications(notifications: &[Notification]) -> Result<String> {
    let mut out = String::new();
    for notification in notifications {
        writeln!(out, "{}", serde_json::to_string(notification)?)?;
    }
    Ok(out)
}
