//! Collaborators the automation core consumes.
//!
//! Everything behind these traits is owned by the host app (remote document
//! store, OS location and geofencing services, local notifications, maps).
//! In-memory adapters live here too; hosts use them for fixtures and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use fieldops_core::{Client, Coordinate, Job};

use crate::error::GeofencingError;
use crate::geofence::GeofenceRegion;
use crate::notification::Notification;

#[async_trait]
pub trait JobProvider: Send + Sync {
    async fn list(&self) -> Vec<Job>;

    async fn job_by_id(&self, id: &str) -> Option<Job>;
}

#[async_trait]
pub trait ClientDirectoryProvider: Send + Sync {
    async fn client_by_id(&self, id: &str) -> Option<Client>;

    async fn list(&self) -> Vec<Client>;
}

/// Device location. Implementations never fail: denial or errors yield `None`.
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn current_location(&self) -> Option<Coordinate>;
}

/// The platform's background geofencing service.
///
/// Region transitions are delivered separately over an
/// `mpsc::Receiver<RegionEvent>` owned by the host.
#[async_trait]
pub trait GeofencingService: Send + Sync {
    /// Ask for background location access. Resolves once the user answers.
    async fn request_background_permission(&self) -> bool;

    async fn start_monitoring(&self, regions: &[GeofenceRegion]) -> Result<(), GeofencingError>;

    /// Must succeed when nothing is being monitored.
    async fn stop_monitoring(&self) -> Result<(), GeofencingError>;

    async fn is_active(&self) -> bool;
}

/// Fire-and-forget local notification delivery.
pub trait NotificationSink: Send + Sync {
    fn show(&self, notification: Notification);
}

/// Opens the device maps app.
pub trait MapLauncher: Send + Sync {
    fn open_route(&self, waypoints: &[Coordinate]);

    fn open_place(&self, coordinate: Coordinate, label: &str);
}

/// Jobs held in memory, keyed by id, preserving insertion order for `list`.
#[derive(Debug, Default)]
pub struct InMemoryJobs {
    jobs: Vec<Job>,
}

impl InMemoryJobs {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl JobProvider for InMemoryJobs {
    async fn list(&self) -> Vec<Job> {
        self.jobs.clone()
    }

    async fn job_by_id(&self, id: &str) -> Option<Job> {
        self.jobs.iter().find(|j| j.id == id).cloned()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryClients {
    order: Vec<String>,
    clients: HashMap<String, Client>,
}

impl InMemoryClients {
    pub fn new(clients: Vec<Client>) -> Self {
        let order = clients.iter().map(|c| c.id.clone()).collect();
        let clients = clients.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self { order, clients }
    }
}

#[async_trait]
impl ClientDirectoryProvider for InMemoryClients {
    async fn client_by_id(&self, id: &str) -> Option<Client> {
        self.clients.get(id).cloned()
    }

    async fn list(&self) -> Vec<Client> {
        self.order.iter().filter_map(|id| self.clients.get(id).cloned()).collect()
    }
}

/// A location service that always reports the same answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinate>);

#[async_trait]
impl LocationService for FixedLocation {
    async fn current_location(&self) -> Option<Coordinate> {
        self.0
    }
}

/// Collects notifications instead of showing them.
#[derive(Debug, Default)]
pub struct MemorySink {
    shown: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Notification> {
        match self.shown.lock() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                tracing::error!("Mutex poisoned reading notifications: {e}");
                Vec::new()
            }
        }
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.shown.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(e) => {
                tracing::error!("Mutex poisoned draining notifications: {e}");
                Vec::new()
            }
        }
    }
}

impl NotificationSink for MemorySink {
    fn show(&self, notification: Notification) {
        match self.shown.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(e) => tracing::error!("Mutex poisoned recording notification: {e}"),
        }
    }
}
