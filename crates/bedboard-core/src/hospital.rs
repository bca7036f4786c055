use crate::delta::BedDelta;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque key identifying a hospital within the store.
pub type HospitalId = String;

/// Full mirror of the `hospitals/` subtree.
///
/// Replaced wholesale on every snapshot, never merged incrementally.
/// Enumeration order is the feed's key order, which the first-key selection
/// fallback depends on.
pub type HospitalCollection = IndexMap<HospitalId, HospitalRecord>;

/// One hospital's ER bed census as stored under `hospitals/<id>`.
///
/// Invariant: `available_er_beds + occupied_er_beds == total_er_beds`, with
/// both counters in `[0, total_er_beds]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalRecord {
    pub name: String,
    pub total_er_beds: u32,
    pub available_er_beds: u32,
    pub occupied_er_beds: u32,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub specialists: Vec<String>,
}

impl HospitalRecord {
    /// Creates a record with all beds available.
    pub fn new(name: impl Into<String>, total_er_beds: u32) -> Self {
        Self {
            name: name.into(),
            total_er_beds,
            available_er_beds: total_er_beds,
            occupied_er_beds: 0,
            specialists: Vec::new(),
        }
    }

    /// Sets the occupied count, keeping the counters consistent.
    pub fn with_occupied(mut self, occupied: u32) -> Self {
        let occupied = occupied.min(self.total_er_beds);
        self.occupied_er_beds = occupied;
        self.available_er_beds = self.total_er_beds - occupied;
        self
    }

    pub fn with_specialists(mut self, specialists: Vec<String>) -> Self {
        self.specialists = specialists;
        self
    }

    /// Checks the bed-count invariant.
    pub fn is_consistent(&self) -> bool {
        self.available_er_beds <= self.total_er_beds
            && self.occupied_er_beds <= self.total_er_beds
            && self.available_er_beds + self.occupied_er_beds == self.total_er_beds
    }

    /// Applies a signed bed delta, validating the resulting counters.
    ///
    /// This is the pure transition at the heart of the bed-count transaction:
    /// it never mutates `self` and is safe to re-evaluate on every retry of
    /// an optimistic commit.
    ///
    /// # Errors
    ///
    /// Returns [`BedsOutOfRange`] if either resulting counter would leave
    /// `[0, total_er_beds]`.
    pub fn apply_delta(&self, delta: BedDelta) -> Result<HospitalRecord, BedsOutOfRange> {
        let change = delta.as_i64();
        let attempted_available = i64::from(self.available_er_beds) + change;
        let attempted_occupied = i64::from(self.occupied_er_beds) - change;

        if attempted_available < 0
            || attempted_available > i64::from(self.total_er_beds)
            || attempted_occupied < 0
            || attempted_occupied > i64::from(self.total_er_beds)
        {
            return Err(BedsOutOfRange {
                hospital: self.name.clone(),
                attempted_available,
                total: self.total_er_beds,
            });
        }

        let mut next = self.clone();
        next.available_er_beds = attempted_available as u32;
        next.occupied_er_beds = attempted_occupied as u32;
        Ok(next)
    }

    /// Occupancy classification of this record.
    pub fn occupancy(&self) -> OccupancyLevel {
        OccupancyLevel::from_counts(self.occupied_er_beds, self.total_er_beds)
    }
}

/// A proposed bed update would leave the valid counter range.
///
/// Carries the offending numbers so callers can surface them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bed count for {hospital} ({attempted_available} / {total}) is out of range")]
pub struct BedsOutOfRange {
    /// Display name of the hospital.
    pub hospital: String,
    /// The available-bed count the update attempted to reach.
    pub attempted_available: i64,
    /// The hospital's total ER bed count.
    pub total: u32,
}

impl From<BedsOutOfRange> for crate::error::CoreError {
    fn from(err: BedsOutOfRange) -> Self {
        crate::error::CoreError::BoundsViolation {
            hospital: err.hospital,
            attempted_available: err.attempted_available,
            total: err.total,
        }
    }
}

/// Coarse occupancy bands used by the detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyLevel {
    /// Below 50% of beds occupied
    Normal,
    /// 50% or more occupied
    Busy,
    /// 80% or more occupied
    Critical,
}

impl OccupancyLevel {
    pub fn from_counts(occupied: u32, total: u32) -> Self {
        if total == 0 {
            return OccupancyLevel::Normal;
        }
        let utilization = f64::from(occupied) / f64::from(total);
        if utilization >= 0.8 {
            OccupancyLevel::Critical
        } else if utilization >= 0.5 {
            OccupancyLevel::Busy
        } else {
            OccupancyLevel::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyLevel::Normal => "normal",
            OccupancyLevel::Busy => "busy",
            OccupancyLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
