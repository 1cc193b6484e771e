// crates/automation/src/lib.rs
//! Stateful automation on top of `fieldops-core`: the route session,
//! geofence lifecycle and the change-driven notification engine.
//!
//! Platform facilities (location, geofencing, notifications, data access)
//! are reached only through the traits in [`ports`].

pub mod config;
pub mod error;
pub mod geofence;
pub mod handle;
pub mod notification;
pub mod ports;
pub mod route_session;
pub mod triggers;

pub use config::AutomationConfig;
pub use error::{ConfigError, GeofenceError, GeofencingError, RouteSessionError};
pub use geofence::{
    build_regions, handle_region_event, jobs_for_day, spawn_region_event_loop, GeofenceManager,
    GeofenceRegion, RegionEvent, RegionTransition, RegistrationReport,
};
pub use handle::WatchHandle;
pub use notification::{Notification, NotificationKind};
pub use ports::*;
pub use route_session::{PlanOutcome, PlanSummary, RouteSession, RouteSessionState};
pub use triggers::{CollectionWatch, EvalContext, NotificationEngine};
