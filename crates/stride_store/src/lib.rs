pub mod service;
pub mod snapshot;

pub use crate::service::{PlannerService, PlannerServiceBuilder};
pub use crate::snapshot::Snapshot;
