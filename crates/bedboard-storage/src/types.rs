//! Transaction decision and outcome types.
//!
//! The decision function hands the store either a full replacement record or
//! an abort; the store answers with the terminal outcome of the attempt.

use bedboard_core::HospitalRecord;

/// What a decision function tells the store to do with the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionDecision {
    /// Propose this full record as the new committed state.
    Commit(HospitalRecord),
    /// Abort the attempt without writing anything.
    Abort(AbortReason),
}

/// Why a transaction attempt was explicitly aborted.
///
/// Aborts are terminal and leave the store untouched; the store must not
/// record a spurious commit of an unchanged value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The target key was absent at read time.
    NotFound,
    /// The proposed counters would leave the valid range.
    BoundsViolation {
        /// Display name of the hospital, for the user-facing message.
        hospital: String,
        /// The available-bed count the update attempted to reach.
        attempted_available: i64,
        /// The hospital's total ER bed count.
        total: u32,
    },
}

impl AbortReason {
    /// Returns `true` for the not-found abort.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` for the bounds-violation abort.
    #[must_use]
    pub fn is_bounds_violation(&self) -> bool {
        matches!(self, Self::BoundsViolation { .. })
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::BoundsViolation {
                hospital,
                attempted_available,
                total,
            } => write!(
                f,
                "bed count for {hospital} ({attempted_available} / {total}) is out of range"
            ),
        }
    }
}

/// Terminal result of a settled transaction.
///
/// Per invocation the state machine is
/// `Pending -> {Committed, Aborted(NotFound), Aborted(BoundsViolation)}`,
/// with store-level failures surfacing as [`crate::StorageError`] instead.
/// No partial state is observable to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The attempt committed; carries the final committed record.
    Committed(HospitalRecord),
    /// The attempt was aborted by the decision function.
    Aborted(AbortReason),
}

impl TransactionOutcome {
    /// Returns the committed record, if any.
    #[must_use]
    pub fn committed(&self) -> Option<&HospitalRecord> {
        match self {
            Self::Committed(record) => Some(record),
            Self::Aborted(_) => None,
        }
    }

    /// Returns `true` if the attempt committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}
