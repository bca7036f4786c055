//! Bed-count transactor: turns operator commands into store transactions
//! and maps every outcome to an operator notice.

use bedboard_core::{BedDelta, CoreError, HospitalRecord};
use bedboard_storage::{AbortReason, RealtimeStore, TransactionDecision, TransactionOutcome};

use crate::notice::Notice;

/// Builds the pure decision function for one bed-count change.
///
/// The returned closure is free of side effects and may be invoked any
/// number of times by the store while it retries against concurrent writers.
pub fn bed_decision(
    delta: BedDelta,
) -> impl Fn(Option<&HospitalRecord>) -> TransactionDecision + Send + Sync {
    move |current| match current {
        None => TransactionDecision::Abort(AbortReason::NotFound),
        Some(record) => match record.apply_delta(delta) {
            Ok(next) => TransactionDecision::Commit(next),
            Err(range) => TransactionDecision::Abort(AbortReason::BoundsViolation {
                hospital: range.hospital,
                attempted_available: range.attempted_available,
                total: range.total,
            }),
        },
    }
}

/// Applies an admission or discharge to `hospital_id` and reports the result.
///
/// Never returns an error: every outcome, including store failures, becomes
/// a notice for the operator. The mirrored view is only updated through the
/// snapshot feed, so an abort leaves the dashboard untouched.
pub async fn update_bed_status(
    store: &dyn RealtimeStore,
    hospital_id: &str,
    delta: BedDelta,
) -> Notice {
    let decide = bed_decision(delta);
    match store.run_transaction(hospital_id, &decide).await {
        Ok(TransactionOutcome::Committed(record)) => {
            tracing::info!(
                hospital_id,
                hospital = %record.name,
                available = record.available_er_beds,
                "Bed count {} committed",
                delta.label()
            );
            Notice::success(format!(
                "{}: patient {} complete (available beds: {})",
                record.name,
                delta.label(),
                record.available_er_beds
            ))
        }
        Ok(TransactionOutcome::Aborted(reason)) => {
            let error = match &reason {
                AbortReason::NotFound => CoreError::record_not_found(hospital_id),
                AbortReason::BoundsViolation {
                    hospital,
                    attempted_available,
                    total,
                } => CoreError::bounds_violation(hospital, *attempted_available, *total),
            };
            tracing::warn!(hospital_id, category = %error.category(), %reason, "Bed count {} aborted", delta.label());
            let message = match &reason {
                AbortReason::NotFound => {
                    format!("[{}] failed: hospital record not found", delta.label())
                }
                AbortReason::BoundsViolation { .. } => {
                    format!("[{}] failed: {}", delta.label(), reason)
                }
            };
            Notice::failure(message)
        }
        Err(error) => {
            let error = CoreError::transaction(error.to_string());
            tracing::error!(hospital_id, category = %error.category(), %error, "Bed count {} failed in the store", delta.label());
            Notice::failure(format!(
                "[{}] a serious error occurred while updating the bed count",
                delta.label()
            ))
        }
    }
}
