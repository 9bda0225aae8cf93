//! Change recording for all-or-nothing engine operations
//!
//! Every in-memory change made through a `Transaction` records both the
//! store mutation that mirrors it and the step that undoes it. The engine
//! commits the mutations as one batch and replays the undo log if the store
//! refuses.

use deskbook_api::{Reservation, Resource, ResourceStatus};
use deskbook_store::Mutation;
use deskbook_util::{ReservationId, ResourceId};

use crate::interval::Instant;
use crate::{EngineResult, ReservationLedger, ResourceRegistry, StatusChange};

#[derive(Debug)]
enum Undo {
    /// Put back a reservation that was removed or replaced
    RestoreReservation(Reservation),
    /// Remove a reservation that was newly inserted
    DropReservation(ReservationId),
    RestoreResource(Resource),
    DropResource(ResourceId),
    RestoreStatus(ResourceId, ResourceStatus),
}

#[derive(Debug, Default)]
pub(crate) struct Transaction {
    mutations: Vec<Mutation>,
    undo: Vec<Undo>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub(crate) fn register_resource(
        &mut self,
        registry: &mut ResourceRegistry,
        resource: Resource,
    ) -> EngineResult<()> {
        let id = resource.id;
        registry.register(resource.clone())?;
        self.mutations.push(Mutation::SaveResource(resource));
        self.undo.push(Undo::DropResource(id));
        Ok(())
    }

    pub(crate) fn deregister_resource(
        &mut self,
        registry: &mut ResourceRegistry,
        id: ResourceId,
    ) -> EngineResult<Resource> {
        let removed = registry.deregister(id)?;
        self.mutations.push(Mutation::DeleteResource(id));
        self.undo.push(Undo::RestoreResource(removed.clone()));
        Ok(removed)
    }

    /// Explicit status write. Records nothing when the status is unchanged.
    pub(crate) fn set_status(
        &mut self,
        registry: &mut ResourceRegistry,
        id: ResourceId,
        status: ResourceStatus,
    ) -> EngineResult<Option<StatusChange>> {
        let from = registry.set_status(id, status)?;
        if from == status {
            return Ok(None);
        }
        self.record_status(id, from, status);
        Ok(Some(StatusChange {
            resource_id: id,
            from,
            to: status,
        }))
    }

    /// Re-derive a resource's status from the ledger as it stands now
    pub(crate) fn recompute_status(
        &mut self,
        registry: &mut ResourceRegistry,
        ledger: &ReservationLedger,
        id: ResourceId,
        now: Instant,
    ) -> EngineResult<Option<StatusChange>> {
        let change = registry.recompute_status(id, ledger.has_active(id, now))?;
        if let Some(change) = change {
            self.record_status(id, change.from, change.to);
        }
        Ok(change)
    }

    /// Insert or replace a reservation
    pub(crate) fn put_reservation(&mut self, ledger: &mut ReservationLedger, reservation: Reservation) {
        let id = reservation.id;
        let replaced = ledger.insert(reservation.clone());
        self.mutations.push(Mutation::SaveReservation(reservation));
        self.undo.push(match replaced {
            Some(previous) => Undo::RestoreReservation(previous),
            None => Undo::DropReservation(id),
        });
    }

    pub(crate) fn remove_reservation(
        &mut self,
        ledger: &mut ReservationLedger,
        id: ReservationId,
    ) -> Option<Reservation> {
        let removed = ledger.remove(id)?;
        self.mutations.push(Mutation::DeleteReservation(id));
        self.undo.push(Undo::RestoreReservation(removed.clone()));
        Some(removed)
    }

    fn record_status(&mut self, id: ResourceId, from: ResourceStatus, to: ResourceStatus) {
        self.mutations
            .push(Mutation::SetResourceStatus { id, status: to });
        self.undo.push(Undo::RestoreStatus(id, from));
    }

    /// Undo every recorded change, newest first
    pub(crate) fn rollback(self, registry: &mut ResourceRegistry, ledger: &mut ReservationLedger) {
        for step in self.undo.into_iter().rev() {
            match step {
                Undo::RestoreReservation(reservation) => {
                    ledger.insert(reservation);
                }
                Undo::DropReservation(id) => {
                    ledger.remove(id);
                }
                Undo::RestoreResource(resource) => {
                    // The slot was vacated by this transaction
                    let _ = registry.register(resource);
                }
                Undo::DropResource(id) => {
                    let _ = registry.deregister(id);
                }
                Undo::RestoreStatus(id, status) => {
                    let _ = registry.set_status(id, status);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use deskbook_api::TimeOfDay;

    fn now() -> Instant {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn booking(id: i64) -> Reservation {
        Reservation {
            id: ReservationId::new(id),
            resource_id: ResourceId::new(1),
            client_name: "Ann".into(),
            date: "10-06-2025".into(),
            start: TimeOfDay::new(9, 0).unwrap(),
            end: TimeOfDay::new(10, 0).unwrap(),
        }
    }

    #[test]
    fn rollback_restores_prior_state() {
        let mut registry: ResourceRegistry = [Resource::new(ResourceId::new(1), "Desk A")]
            .into_iter()
            .collect();
        let mut ledger: ReservationLedger = [booking(100)].into_iter().collect();

        let mut txn = Transaction::new();
        txn.remove_reservation(&mut ledger, ReservationId::new(100));
        txn.put_reservation(&mut ledger, booking(101));
        txn.recompute_status(&mut registry, &ledger, ResourceId::new(1), now())
            .unwrap();
        txn.deregister_resource(&mut registry, ResourceId::new(1))
            .unwrap();
        assert_eq!(txn.mutations().len(), 4);

        txn.rollback(&mut registry, &mut ledger);

        assert!(ledger.contains(ReservationId::new(100)));
        assert!(!ledger.contains(ReservationId::new(101)));
        let desk = registry.get(ResourceId::new(1)).unwrap();
        assert_eq!(desk.status, ResourceStatus::Available);
    }

    #[test]
    fn unchanged_status_records_nothing() {
        let mut registry: ResourceRegistry = [Resource::new(ResourceId::new(1), "Desk A")]
            .into_iter()
            .collect();

        let mut txn = Transaction::new();
        let change = txn
            .set_status(&mut registry, ResourceId::new(1), ResourceStatus::Available)
            .unwrap();
        assert!(change.is_none());
        assert!(txn.is_empty());
    }
}
