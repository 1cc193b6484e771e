//! Geofences around today's jobs.
//!
//! [`GeofenceManager`] keeps the platform geofencing service in sync with the
//! day's schedule. Each registration cycle is a full replace: whatever was
//! monitored before is stopped first, so yesterday's regions never linger.
//!
//! Region transitions arrive from the platform's background task, possibly
//! after the UI is gone. [`handle_region_event`] therefore takes its
//! collaborators explicitly and holds no manager state.

use std::sync::{Arc, RwLock};

use chrono::{Local, NaiveDate, TimeZone};
use fieldops_core::{geo, ClientDirectory, ClientIndex, Coordinate, Job};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::AutomationConfig;
use crate::error::GeofenceError;
use crate::handle::WatchHandle;
use crate::notification::Notification;
use crate::ports::{ClientDirectoryProvider, GeofencingService, JobProvider, NotificationSink};

/// A circular region monitored by the platform, identified by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRegion {
    pub identifier: String,
    pub center: Coordinate,
    pub radius_meters: f64,
    pub notify_on_enter: bool,
    pub notify_on_exit: bool,
}

impl GeofenceRegion {
    /// Region for a job, alerting on both entry and exit.
    pub fn for_job(job_id: impl Into<String>, center: Coordinate, radius_meters: f64) -> Self {
        Self {
            identifier: job_id.into(),
            center,
            radius_meters,
            notify_on_enter: true,
            notify_on_exit: true,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        geo::contains(self.center, self.radius_meters, point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionTransition {
    Enter,
    Exit,
}

/// A transition reported by the platform for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEvent {
    #[serde(rename = "type")]
    pub transition: RegionTransition,
    pub region_id: String,
}

impl RegionEvent {
    pub fn enter(region_id: impl Into<String>) -> Self {
        Self {
            transition: RegionTransition::Enter,
            region_id: region_id.into(),
        }
    }

    pub fn exit(region_id: impl Into<String>) -> Self {
        Self {
            transition: RegionTransition::Exit,
            region_id: region_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReport {
    /// Jobs scheduled for the day that qualified for a region.
    pub candidates: usize,
    /// Candidates skipped because no coordinate could be resolved.
    pub unresolvable: usize,
    /// Regions the platform is now monitoring.
    pub active: usize,
}

/// Jobs that start on `day` (in `tz`), are Scheduled or In Progress, and are not archived.
pub fn jobs_for_day<'a, Tz: TimeZone>(jobs: &'a [Job], day: NaiveDate, tz: &Tz) -> Vec<&'a Job> {
    jobs.iter()
        .filter(|job| !job.archived && job.status.is_active())
        .filter(|job| {
            job.start
                .map(|start| start.with_timezone(tz).date_naive() == day)
                .unwrap_or(false)
        })
        .collect()
}

/// One region per resolvable job. Returns the regions and the number skipped.
pub fn build_regions<D: ClientDirectory + ?Sized>(
    jobs: &[&Job],
    directory: &D,
    radius_meters: f64,
) -> (Vec<GeofenceRegion>, usize) {
    let mut regions = Vec::with_capacity(jobs.len());
    let mut skipped = 0;
    for job in jobs {
        match fieldops_core::resolve(job, directory) {
            Some(center) => regions.push(GeofenceRegion::for_job(job.id.clone(), center, radius_meters)),
            None => {
                tracing::debug!(job_id = %job.id, "No coordinate for job; no geofence");
                skipped += 1;
            }
        }
    }
    (regions, skipped)
}

pub struct GeofenceManager {
    jobs: Arc<dyn JobProvider>,
    clients: Arc<dyn ClientDirectoryProvider>,
    geofencing: Arc<dyn GeofencingService>,
    radius_meters: f64,
    active: RwLock<Vec<GeofenceRegion>>,
}

impl GeofenceManager {
    pub fn new(
        jobs: Arc<dyn JobProvider>,
        clients: Arc<dyn ClientDirectoryProvider>,
        geofencing: Arc<dyn GeofencingService>,
        config: &AutomationConfig,
    ) -> Self {
        Self {
            jobs,
            clients,
            geofencing,
            radius_meters: config.geofence_radius_m,
            active: RwLock::new(Vec::new()),
        }
    }

    /// Register regions for jobs starting today in device-local time.
    pub async fn register_today_regions(&self) -> Result<RegistrationReport, GeofenceError> {
        let today = Local::now().date_naive();
        self.register_regions_for(today, &Local).await
    }

    /// Replace the monitored set with regions for `day`'s jobs.
    ///
    /// Permission denial returns an error before anything is touched.
    /// Platform failures are logged and leave zero active regions.
    pub async fn register_regions_for<Tz>(&self, day: NaiveDate, tz: &Tz) -> Result<RegistrationReport, GeofenceError>
    where
        Tz: TimeZone + Sync,
    {
        if !self.geofencing.request_background_permission().await {
            tracing::warn!("Background location permission denied; geofences not registered");
            metrics::counter!("fieldops_geofence_registrations_total", "outcome" => "permission_denied").increment(1);
            return Err(GeofenceError::PermissionDenied);
        }

        let jobs = self.jobs.list().await;
        let candidates = jobs_for_day(&jobs, day, tz);
        let directory: ClientIndex = self.clients.list().await.into_iter().collect();
        let (regions, unresolvable) = build_regions(&candidates, &directory, self.radius_meters);

        let mut report = RegistrationReport {
            candidates: candidates.len(),
            unresolvable,
            active: 0,
        };

        self.stop_all_regions().await;

        if regions.is_empty() {
            tracing::info!(%day, candidates = report.candidates, "No geofences to register");
            metrics::counter!("fieldops_geofence_registrations_total", "outcome" => "empty").increment(1);
            return Ok(report);
        }

        match self.geofencing.start_monitoring(&regions).await {
            Ok(()) => {
                report.active = regions.len();
                self.replace_active(regions);
                tracing::info!(
                    %day,
                    regions = report.active,
                    unresolvable = report.unresolvable,
                    "Geofences registered"
                );
                metrics::counter!("fieldops_geofence_registrations_total", "outcome" => "registered").increment(1);
            }
            Err(e) => {
                tracing::warn!(%day, error = %e, "Geofence registration failed (non-fatal)");
                metrics::counter!("fieldops_geofence_registrations_total", "outcome" => "failed").increment(1);
            }
        }
        Ok(report)
    }

    /// Deregister everything. Never fails, including when nothing is registered.
    pub async fn stop_all_regions(&self) {
        if let Err(e) = self.geofencing.stop_monitoring().await {
            tracing::warn!(error = %e, "Stopping geofences failed (non-fatal)");
        }
        self.replace_active(Vec::new());
    }

    /// Regions the manager last installed successfully.
    pub fn active_regions(&self) -> Vec<GeofenceRegion> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading geofence regions: {e}");
                Vec::new()
            }
        }
    }

    pub async fn is_active(&self) -> bool {
        self.geofencing.is_active().await
    }

    /// Drive [`handle_region_event`] from the platform's event channel.
    pub fn spawn_event_loop(&self, events: mpsc::Receiver<RegionEvent>, sink: Arc<dyn NotificationSink>) -> WatchHandle {
        spawn_region_event_loop(events, Arc::clone(&self.jobs), sink)
    }

    fn replace_active(&self, regions: Vec<GeofenceRegion>) {
        match self.active.write() {
            Ok(mut guard) => *guard = regions,
            Err(e) => tracing::error!("RwLock poisoned writing geofence regions: {e}"),
        }
    }
}

/// React to one region transition. Returns the notification shown, if any.
///
/// Enter on a known job prompts starting the timer. Exit prompts clocking
/// out only while a labor timer is still running. Unknown regions are ignored.
pub async fn handle_region_event(
    event: &RegionEvent,
    jobs: &dyn JobProvider,
    sink: &dyn NotificationSink,
) -> Option<Notification> {
    let Some(job) = jobs.job_by_id(&event.region_id).await else {
        tracing::debug!(region_id = %event.region_id, "Region event for unknown job ignored");
        return None;
    };

    let notification = match event.transition {
        RegionTransition::Enter => Notification::arrived(&job),
        RegionTransition::Exit if job.has_open_labor() => Notification::clock_out_reminder(&job),
        RegionTransition::Exit => {
            tracing::debug!(job_id = %job.id, "Exit with no running timer; nothing to do");
            return None;
        }
    };

    tracing::info!(job_id = %job.id, kind = notification.kind.as_str(), "Geofence notification");
    metrics::counter!("fieldops_notifications_total", "kind" => notification.kind.as_str()).increment(1);
    sink.show(notification.clone());
    Some(notification)
}

/// Consume region events until the channel closes or the handle is stopped.
pub fn spawn_region_event_loop(
    mut events: mpsc::Receiver<RegionEvent>,
    jobs: Arc<dyn JobProvider>,
    sink: Arc<dyn NotificationSink>,
) -> WatchHandle {
    WatchHandle::spawn("region_events", move |token| async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        handle_region_event(&event, jobs.as_ref(), sink.as_ref()).await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Region event loop stopped");
    })
}
