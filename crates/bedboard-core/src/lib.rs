pub mod delta;
pub mod error;
pub mod events;
pub mod hospital;

pub use delta::BedDelta;
pub use error::{CoreError, ErrorCategory, Result};
pub use events::{SnapshotBroadcaster, StoreEvent};
pub use hospital::{BedsOutOfRange, HospitalCollection, HospitalId, HospitalRecord, OccupancyLevel};
