//! Expiration sweeper

use deskbook_util::{ReservationId, ResourceId};
use std::collections::BTreeSet;
use tracing::info;

use crate::interval::Instant;
use crate::{EngineResult, ReservationEngine, StatusChange};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Reservations removed because they ended before the sweep instant
    pub expired_ids: Vec<ReservationId>,
    pub status_changes: Vec<StatusChange>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired_ids.is_empty() && self.status_changes.is_empty()
    }
}

impl ReservationEngine {
    /// Retire every reservation that ended strictly before `now` and refresh
    /// the status of each resource that lost one.
    ///
    /// Reservations with an unrepresentable date are never retired. Running
    /// it again with the same `now` finds nothing.
    pub fn sweep(&mut self, now: Instant) -> EngineResult<SweepReport> {
        let expired_ids = self.ledger().expired(now);

        let status_changes = self.transact(|txn, registry, ledger| {
            let mut touched = BTreeSet::<ResourceId>::new();
            for &id in &expired_ids {
                if let Some(removed) = txn.remove_reservation(ledger, id) {
                    touched.insert(removed.resource_id);
                }
            }

            let mut changes = Vec::new();
            for resource_id in touched {
                changes.extend(txn.recompute_status(registry, ledger, resource_id, now)?);
            }
            Ok(changes)
        })?;
        self.mark_swept();

        let report = SweepReport {
            expired_ids,
            status_changes,
        };
        if !report.is_empty() {
            info!(
                expired = report.expired_ids.len(),
                status_changes = report.status_changes.len(),
                "Swept expired reservations"
            );
        }
        Ok(report)
    }
}
