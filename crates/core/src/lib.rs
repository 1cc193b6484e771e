// crates/core/src/lib.rs
//! Pure domain logic for field-operations automation: the data model, geo
//! math, coordinate resolution and route ordering. No I/O, no runtime.

pub mod error;
pub mod geo;
pub mod maps;
pub mod optimizer;
pub mod resolver;
pub mod types;

pub use error::*;
pub use geo::{contains, distance_km, km_to_miles, DisplayDistance};
pub use optimizer::{optimize, RoutableJob, RoutePlan, RouteStop};
pub use resolver::{partition_routable, resolve, ClientDirectory, ClientIndex};
pub use types::*;
