//! The day's planned visit order and the cursor into it.
//!
//! [`RouteSession`] is the single writer of the active [`RoutePlan`]. UI code
//! reads snapshots and subscribes to state transitions; it never mutates.
//!
//! Every `plan_route` call takes a generation number. When a slow call
//! resolves after a newer one (or after `clear`), its result is discarded.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use fieldops_core::{optimize, partition_routable, ClientDirectory, Coordinate, Job, RoutePlan, RouteStop};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::AutomationConfig;
use crate::error::RouteSessionError;
use crate::ports::{LocationService, MapLauncher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RouteSessionState {
    Idle = 0,
    Optimizing = 1,
    Ready = 2,
    /// Published by `clear` immediately before returning to `Idle`.
    Cleared = 3,
}

impl RouteSessionState {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Idle),
            1 => Some(Self::Optimizing),
            2 => Some(Self::Ready),
            3 => Some(Self::Cleared),
            _ => None,
        }
    }
}

/// What a finished plan looked like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub generation: u64,
    pub stops: usize,
    pub unroutable: usize,
    pub total_distance_km: f64,
    pub start: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// The plan was stored and is now active.
    Applied(PlanSummary),
    /// A newer `plan_route` or a `clear` happened first; the result was dropped.
    Superseded { generation: u64 },
}

#[derive(Debug, Default)]
struct ActivePlan {
    plan: RoutePlan,
    cursor: usize,
    unroutable: usize,
}

pub struct RouteSession {
    location: Arc<dyn LocationService>,
    location_timeout: Duration,
    generation: AtomicU64,
    state: AtomicU8,
    active: RwLock<ActivePlan>,
    state_tx: broadcast::Sender<RouteSessionState>,
}

impl RouteSession {
    pub fn new(location: Arc<dyn LocationService>, config: &AutomationConfig) -> Self {
        let (state_tx, _) = broadcast::channel(32);
        Self {
            location,
            location_timeout: config.location_timeout(),
            generation: AtomicU64::new(0),
            state: AtomicU8::new(RouteSessionState::Idle as u8),
            active: RwLock::new(ActivePlan::default()),
            state_tx,
        }
    }

    // -- Planning -------------------------------------------------------------

    /// Plan a route over `jobs`, starting from the device location when known.
    ///
    /// Jobs the resolver cannot place are excluded and counted in
    /// [`unroutable_count`](Self::unroutable_count).
    pub async fn plan_route<D>(&self, jobs: &[Job], directory: &D) -> PlanOutcome
    where
        D: ClientDirectory + Sync + ?Sized,
    {
        let generation = {
            let _active = self.write_active();
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.set_state(RouteSessionState::Optimizing);
            generation
        };
        tracing::debug!(generation, jobs = jobs.len(), "Planning route");

        let start = self.fetch_start().await;
        let (routable, unroutable) = partition_routable(jobs, directory);
        let plan = optimize(routable, start);

        let mut active = self.write_active();
        // Generation, plan and state change together under this lock.
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(active);
            tracing::debug!(generation, "Discarding stale route plan");
            metrics::counter!("fieldops_route_plans_total", "outcome" => "superseded").increment(1);
            return PlanOutcome::Superseded { generation };
        }

        let summary = PlanSummary {
            generation,
            stops: plan.len(),
            unroutable,
            total_distance_km: plan.total_distance_km(),
            start,
        };
        *active = ActivePlan {
            plan,
            cursor: 0,
            unroutable,
        };
        self.set_state(RouteSessionState::Ready);
        drop(active);

        metrics::counter!("fieldops_route_plans_total", "outcome" => "applied").increment(1);
        tracing::info!(
            generation,
            stops = summary.stops,
            unroutable = summary.unroutable,
            total_km = summary.total_distance_km,
            has_start = start.is_some(),
            "Route plan ready"
        );
        PlanOutcome::Applied(summary)
    }

    async fn fetch_start(&self) -> Option<Coordinate> {
        match tokio::time::timeout(self.location_timeout, self.location.current_location()).await {
            Ok(Some(coord)) => Some(coord),
            Ok(None) => {
                tracing::debug!("No device location; planning from the first job");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.location_timeout.as_secs(),
                    "Location fetch timed out; planning from the first job"
                );
                None
            }
        }
    }

    // -- Cursor and manual edits ----------------------------------------------

    /// Move to the next stop. Stays on the last stop once there.
    pub fn advance(&self) -> usize {
        let mut active = self.write_active();
        if active.cursor + 1 < active.plan.len() {
            active.cursor += 1;
        }
        active.cursor
    }

    /// Move the stop at `from` to `to`.
    ///
    /// Route order and leg distances are recomputed for the new order. The
    /// cursor keeps pointing at the same job.
    pub fn reorder(&self, from: usize, to: usize) -> Result<(), RouteSessionError> {
        let mut active = self.write_active();
        let current_id = active.plan.get(active.cursor).map(|s| s.job.id.clone());
        active.plan.move_stop(from, to)?;
        if let Some(id) = current_id {
            if let Some(pos) = active.plan.stops().iter().position(|s| s.job.id == id) {
                active.cursor = pos;
            }
        }
        tracing::debug!(from, to, "Route reordered by hand");
        Ok(())
    }

    /// Drop the plan and return to `Idle`. In-flight plans become stale.
    pub fn clear(&self) {
        let mut active = self.write_active();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *active = ActivePlan::default();
        self.set_state(RouteSessionState::Cleared);
        self.set_state(RouteSessionState::Idle);
        drop(active);
        tracing::debug!("Route cleared");
    }

    // -- Readers --------------------------------------------------------------

    pub fn state(&self) -> RouteSessionState {
        let raw = self.state.load(Ordering::SeqCst);
        RouteSessionState::from_u8(raw).unwrap_or(RouteSessionState::Idle)
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<RouteSessionState> {
        self.state_tx.subscribe()
    }

    pub fn plan(&self) -> RoutePlan {
        self.read_active().plan.clone()
    }

    pub fn cursor(&self) -> usize {
        self.read_active().cursor
    }

    pub fn current_stop(&self) -> Option<RouteStop> {
        let active = self.read_active();
        active.plan.get(active.cursor).cloned()
    }

    pub fn unroutable_count(&self) -> usize {
        self.read_active().unroutable
    }

    pub fn total_distance_km(&self) -> f64 {
        self.read_active().plan.total_distance_km()
    }

    // -- Maps -----------------------------------------------------------------

    /// Open the remaining stops, from the cursor on, in the maps app.
    /// Returns false when there is nothing left to open.
    pub fn open_in_maps(&self, launcher: &dyn MapLauncher) -> bool {
        let waypoints: Vec<Coordinate> = {
            let active = self.read_active();
            active.plan.stops().iter().skip(active.cursor).map(|s| s.coordinate).collect()
        };
        if waypoints.is_empty() {
            return false;
        }
        launcher.open_route(&waypoints);
        true
    }

    /// Open the current stop as a single labelled pin.
    pub fn open_current_stop(&self, launcher: &dyn MapLauncher) -> bool {
        match self.current_stop() {
            Some(stop) => {
                launcher.open_place(stop.coordinate, stop.job.display_title());
                true
            }
            None => false,
        }
    }

    /// Callers hold the `active` write guard.
    fn set_state(&self, state: RouteSessionState) {
        self.state.store(state as u8, Ordering::SeqCst);
        // No subscribers is fine.
        let _ = self.state_tx.send(state);
    }

    fn read_active(&self) -> RwLockReadGuard<'_, ActivePlan> {
        self.active.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading route plan: {e}");
            e.into_inner()
        })
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, ActivePlan> {
        self.active.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing route plan: {e}");
            e.into_inner()
        })
    }
}
