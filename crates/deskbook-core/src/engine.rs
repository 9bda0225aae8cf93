//! Reservation engine
//!
//! Owns the registry and the ledger and keeps both in step with the store.
//! Every operation stages its changes in memory, commits the implied store
//! mutations as one batch and undoes the in-memory changes if that fails.

use deskbook_api::{Reservation, ReservationUpdate, Resource, ResourceStatus};
use deskbook_store::Store;
use deskbook_util::{ReservationId, ResourceId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::interval::Instant;
use crate::txn::Transaction;
use crate::{EngineError, EngineResult, ReservationLedger, ResourceRegistry, StatusChange};

/// Engine behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Sweep expired reservations before every listing, not only the first
    pub sweep_before_listing: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sweep_before_listing: true,
        }
    }
}

/// The reservation consistency engine
pub struct ReservationEngine {
    store: Arc<dyn Store>,
    registry: ResourceRegistry,
    ledger: ReservationLedger,
    options: EngineOptions,
    swept_once: bool,
}

impl ReservationEngine {
    /// Load state from the store and repair it.
    ///
    /// Reservations pointing at missing resources are dropped and every
    /// resource status is re-derived from the ledger at `now`. Repairs are
    /// written back before the engine is returned.
    pub fn open(store: Arc<dyn Store>, options: EngineOptions, now: Instant) -> EngineResult<Self> {
        let registry: ResourceRegistry = store.load_resources()?.into_iter().collect();
        let ledger: ReservationLedger = store.load_reservations()?.into_iter().collect();

        let mut engine = Self {
            store,
            registry,
            ledger,
            options,
            swept_once: false,
        };
        engine.reconcile(now)?;

        info!(
            resources = engine.registry.len(),
            reservations = engine.ledger.len(),
            "Reservation engine opened"
        );

        Ok(engine)
    }

    fn reconcile(&mut self, now: Instant) -> EngineResult<()> {
        let orphans: Vec<ReservationId> = self
            .ledger
            .iter()
            .filter(|r| !self.registry.contains(r.resource_id))
            .map(|r| r.id)
            .collect();
        let resource_ids: Vec<ResourceId> = self.registry.iter().map(|r| r.id).collect();

        let changes = self.transact(|txn, registry, ledger| {
            for &id in &orphans {
                warn!(reservation_id = %id, "Dropping reservation for unknown resource");
                txn.remove_reservation(ledger, id);
            }

            let mut changes = Vec::new();
            for &id in &resource_ids {
                changes.extend(txn.recompute_status(registry, ledger, id, now)?);
            }
            Ok(changes)
        })?;

        for change in changes {
            warn!(
                resource_id = %change.resource_id,
                from = %change.from,
                to = %change.to,
                "Reconciled stored resource status"
            );
        }

        Ok(())
    }

    /// Run `stage` against the in-memory state, then commit what it
    /// recorded. Either everything lands or nothing does.
    pub(crate) fn transact<T, F>(&mut self, stage: F) -> EngineResult<T>
    where
        F: FnOnce(&mut Transaction, &mut ResourceRegistry, &mut ReservationLedger) -> EngineResult<T>,
    {
        let mut txn = Transaction::new();

        let value = match stage(&mut txn, &mut self.registry, &mut self.ledger) {
            Ok(value) => value,
            Err(e) => {
                txn.rollback(&mut self.registry, &mut self.ledger);
                return Err(e);
            }
        };

        if txn.is_empty() {
            return Ok(value);
        }

        if let Err(e) = self.store.commit(txn.mutations()) {
            warn!(
                error = %e,
                mutations = txn.mutations().len(),
                "Store commit failed, rolling back"
            );
            txn.rollback(&mut self.registry, &mut self.ledger);
            return Err(EngineError::Store(e));
        }

        debug!(mutations = txn.mutations().len(), "Committed");
        Ok(value)
    }

    pub(crate) fn mark_swept(&mut self) {
        self.swept_once = true;
    }

    // Queries

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.registry.get(id)
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.ledger.get(id)
    }

    /// Resources in id order, after sweeping expired reservations
    pub fn list_resources(&mut self, now: Instant) -> EngineResult<Vec<Resource>> {
        self.sweep_for_listing(now)?;
        Ok(self.registry.iter().cloned().collect())
    }

    /// Reservations in id order, optionally for one resource, after sweeping
    pub fn list_reservations(
        &mut self,
        resource_id: Option<ResourceId>,
        now: Instant,
    ) -> EngineResult<Vec<Reservation>> {
        self.sweep_for_listing(now)?;

        if let Some(id) = resource_id
            && !self.registry.contains(id)
        {
            return Err(EngineError::ResourceNotFound(id));
        }

        Ok(self
            .ledger
            .iter()
            .filter(|r| resource_id.is_none_or(|id| r.resource_id == id))
            .cloned()
            .collect())
    }

    fn sweep_for_listing(&mut self, now: Instant) -> EngineResult<()> {
        if !self.swept_once || self.options.sweep_before_listing {
            self.sweep(now)?;
        }
        Ok(())
    }

    // Resources

    /// Add a new resource. It may start out available or in maintenance.
    pub fn register_resource(&mut self, resource: Resource) -> EngineResult<()> {
        if resource.name.trim().is_empty() {
            return Err(EngineError::validation("resource name cannot be empty"));
        }
        if resource.status == ResourceStatus::Booked {
            return Err(EngineError::validation(
                "a new resource cannot start out booked",
            ));
        }

        let id = resource.id;
        let name = resource.name.clone();
        self.transact(|txn, registry, _| txn.register_resource(registry, resource))?;

        info!(resource_id = %id, name = %name, "Resource registered");
        Ok(())
    }

    /// Remove a resource together with all of its reservations.
    /// Returns the ids of the deleted reservations.
    pub fn deregister_resource(&mut self, id: ResourceId) -> EngineResult<Vec<ReservationId>> {
        if !self.registry.contains(id) {
            return Err(EngineError::ResourceNotFound(id));
        }

        let removed = self.transact(|txn, registry, ledger| {
            let ids: Vec<ReservationId> = ledger.for_resource(id).map(|r| r.id).collect();
            for &reservation_id in &ids {
                txn.remove_reservation(ledger, reservation_id);
            }
            txn.deregister_resource(registry, id)?;
            Ok(ids)
        })?;

        info!(
            resource_id = %id,
            cascaded = removed.len(),
            "Resource deregistered"
        );
        Ok(removed)
    }

    /// Explicitly set a resource's status.
    ///
    /// Maintenance is always allowed. Available and booked must agree with
    /// whether the resource has an active reservation at `now`.
    pub fn set_resource_status(
        &mut self,
        id: ResourceId,
        status: ResourceStatus,
        now: Instant,
    ) -> EngineResult<Option<StatusChange>> {
        if !self.registry.contains(id) {
            return Err(EngineError::ResourceNotFound(id));
        }

        let active = self.ledger.has_active(id, now);
        match status {
            ResourceStatus::Available if active => {
                return Err(EngineError::validation(format!(
                    "resource {id} has active reservations and cannot be available"
                )));
            }
            ResourceStatus::Booked if !active => {
                return Err(EngineError::validation(format!(
                    "resource {id} has no active reservation and cannot be booked"
                )));
            }
            _ => {}
        }

        let change = self.transact(|txn, registry, _| txn.set_status(registry, id, status))?;

        if let Some(change) = &change {
            info!(
                resource_id = %id,
                from = %change.from,
                to = %change.to,
                "Resource status set"
            );
        }
        Ok(change)
    }

    // Reservations

    /// Accept a new reservation, or explain why not
    pub fn add_reservation(&mut self, candidate: Reservation, now: Instant) -> EngineResult<Reservation> {
        if self.ledger.contains(candidate.id) {
            return Err(EngineError::DuplicateReservation(candidate.id));
        }
        self.ledger.validate(&candidate, &self.registry, now, None)?;

        let accepted = candidate.clone();
        self.transact(|txn, registry, ledger| {
            let resource_id = candidate.resource_id;
            txn.put_reservation(ledger, candidate);
            txn.recompute_status(registry, ledger, resource_id, now)
        })?;

        info!(
            reservation_id = %accepted.id,
            resource_id = %accepted.resource_id,
            date = %accepted.date,
            start = %accepted.start,
            end = %accepted.end,
            "Reservation added"
        );
        Ok(accepted)
    }

    /// Delete a reservation and refresh its resource's status
    pub fn remove_reservation(&mut self, id: ReservationId, now: Instant) -> EngineResult<Reservation> {
        let removed = self.transact(|txn, registry, ledger| {
            let removed = txn
                .remove_reservation(ledger, id)
                .ok_or(EngineError::ReservationNotFound(id))?;
            txn.recompute_status(registry, ledger, removed.resource_id, now)?;
            Ok(removed)
        })?;

        info!(
            reservation_id = %id,
            resource_id = %removed.resource_id,
            "Reservation removed"
        );
        Ok(removed)
    }

    /// Replace fields of an existing reservation.
    ///
    /// The result is validated like a new reservation, except that it may
    /// overlap its own previous version. On any failure the existing
    /// reservation is left as it was.
    pub fn update_reservation(
        &mut self,
        id: ReservationId,
        update: &ReservationUpdate,
        now: Instant,
    ) -> EngineResult<Reservation> {
        let current = self
            .ledger
            .get(id)
            .cloned()
            .ok_or(EngineError::ReservationNotFound(id))?;
        let candidate = update.apply_to(&current);
        self.ledger
            .validate(&candidate, &self.registry, now, Some(id))?;

        let updated = candidate.clone();
        self.transact(|txn, registry, ledger| {
            let new_resource = candidate.resource_id;
            txn.put_reservation(ledger, candidate);
            txn.recompute_status(registry, ledger, new_resource, now)?;
            if current.resource_id != new_resource {
                txn.recompute_status(registry, ledger, current.resource_id, now)?;
            }
            Ok(())
        })?;

        info!(
            reservation_id = %id,
            resource_id = %updated.resource_id,
            moved = current.resource_id != updated.resource_id,
            "Reservation updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use deskbook_api::{ResourceKind, TimeOfDay};
    use deskbook_store::MemoryStore;

    fn at(day: u32, h: u32, m: u32) -> Instant {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn now() -> Instant {
        at(1, 8, 0)
    }

    fn time(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::new(h, m).unwrap()
    }

    fn booking(id: i64, resource: i64, start: (u8, u8), end: (u8, u8)) -> Reservation {
        Reservation {
            id: ReservationId::new(id),
            resource_id: ResourceId::new(resource),
            client_name: "Ann".into(),
            date: "10-06-2025".into(),
            start: time(start.0, start.1),
            end: time(end.0, end.1),
        }
    }

    /// Desk A (id 1) with reservation 100 on 10-06-2025 09:00-10:00
    fn setup() -> (Arc<MemoryStore>, ReservationEngine) {
        let store = Arc::new(MemoryStore::new());
        let mut engine =
            ReservationEngine::open(store.clone(), EngineOptions::default(), now()).unwrap();
        engine
            .register_resource(Resource::new(ResourceId::new(1), "Desk A"))
            .unwrap();
        engine
            .add_reservation(booking(100, 1, (9, 0), (10, 0)), now())
            .unwrap();
        (store, engine)
    }

    fn status(engine: &ReservationEngine, id: i64) -> ResourceStatus {
        engine.resource(ResourceId::new(id)).unwrap().status
    }

    #[test]
    fn overlapping_booking_is_rejected_and_back_to_back_accepted() {
        let (store, mut engine) = setup();
        assert_eq!(status(&engine, 1), ResourceStatus::Booked);

        let result = engine.add_reservation(booking(101, 1, (9, 30), (10, 30)), now());
        assert!(matches!(
            result,
            Err(EngineError::Conflict { conflicting_id }) if conflicting_id == ReservationId::new(100)
        ));
        assert!(engine.reservation(ReservationId::new(101)).is_none());

        engine
            .add_reservation(booking(102, 1, (10, 0), (11, 0)), now())
            .unwrap();
        assert_eq!(store.reservations().len(), 2);
        assert_eq!(status(&engine, 1), ResourceStatus::Booked);
    }

    #[test]
    fn duplicate_reservation_id_is_rejected() {
        let (_, mut engine) = setup();
        let result = engine.add_reservation(booking(100, 1, (14, 0), (15, 0)), now());
        assert!(matches!(result, Err(EngineError::DuplicateReservation(_))));
    }

    #[test]
    fn add_then_remove_restores_previous_state() {
        let (store, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();
        let ledger_before: Vec<_> = engine.ledger().iter().cloned().collect();

        engine
            .add_reservation(booking(200, 2, (9, 0), (10, 0)), now())
            .unwrap();
        assert_eq!(status(&engine, 2), ResourceStatus::Booked);

        engine
            .remove_reservation(ReservationId::new(200), now())
            .unwrap();
        assert_eq!(status(&engine, 2), ResourceStatus::Available);
        let ledger_after: Vec<_> = engine.ledger().iter().cloned().collect();
        assert_eq!(ledger_before, ledger_after);
        assert_eq!(store.reservations(), ledger_after);
        assert_eq!(
            store.resources()[1].status,
            ResourceStatus::Available
        );
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let (store, mut engine) = setup();
        let commits = store.commit_count();
        assert!(matches!(
            engine.remove_reservation(ReservationId::new(999), now()),
            Err(EngineError::ReservationNotFound(_))
        ));
        assert_eq!(store.commit_count(), commits);
    }

    #[test]
    fn invalid_update_leaves_reservation_unchanged() {
        let (store, mut engine) = setup();
        let before = engine.reservation(ReservationId::new(100)).unwrap().clone();

        let update = ReservationUpdate {
            end: Some(time(8, 30)),
            ..Default::default()
        };
        let result = engine.update_reservation(ReservationId::new(100), &update, now());
        assert!(matches!(result, Err(EngineError::Validation(_))));

        assert_eq!(engine.reservation(ReservationId::new(100)), Some(&before));
        assert_eq!(store.reservations(), vec![before]);
    }

    #[test]
    fn update_may_overlap_its_previous_self() {
        let (_, mut engine) = setup();
        let update = ReservationUpdate {
            start: Some(time(8, 30)),
            end: Some(time(10, 30)),
            ..Default::default()
        };
        let updated = engine
            .update_reservation(ReservationId::new(100), &update, now())
            .unwrap();
        assert_eq!(updated.start, time(8, 30));
        assert_eq!(updated.client_name, "Ann");
    }

    #[test]
    fn update_conflicting_with_another_reservation_is_rejected() {
        let (_, mut engine) = setup();
        engine
            .add_reservation(booking(102, 1, (10, 0), (11, 0)), now())
            .unwrap();

        let update = ReservationUpdate {
            end: Some(time(10, 15)),
            ..Default::default()
        };
        let result = engine.update_reservation(ReservationId::new(100), &update, now());
        assert!(matches!(
            result,
            Err(EngineError::Conflict { conflicting_id }) if conflicting_id == ReservationId::new(102)
        ));
    }

    #[test]
    fn moving_a_reservation_recomputes_both_resources() {
        let (store, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();

        let update = ReservationUpdate {
            resource_id: Some(ResourceId::new(2)),
            ..Default::default()
        };
        engine
            .update_reservation(ReservationId::new(100), &update, now())
            .unwrap();

        assert_eq!(status(&engine, 1), ResourceStatus::Available);
        assert_eq!(status(&engine, 2), ResourceStatus::Booked);
        let stored = store.resources();
        assert_eq!(stored[0].status, ResourceStatus::Available);
        assert_eq!(stored[1].status, ResourceStatus::Booked);
    }

    #[test]
    fn moving_onto_an_occupied_resource_conflicts() {
        let (store, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();
        // Same day as 100, written without zero padding
        let mut occupant = booking(200, 2, (9, 30), (10, 30));
        occupant.date = "10-6-2025".into();
        engine.add_reservation(occupant, now()).unwrap();
        let commits = store.commit_count();

        let update = ReservationUpdate {
            resource_id: Some(ResourceId::new(2)),
            ..Default::default()
        };
        let result = engine.update_reservation(ReservationId::new(100), &update, now());
        assert!(matches!(
            result,
            Err(EngineError::Conflict { conflicting_id }) if conflicting_id == ReservationId::new(200)
        ));

        let kept = engine.reservation(ReservationId::new(100)).unwrap();
        assert_eq!(kept.resource_id, ResourceId::new(1));
        assert_eq!(status(&engine, 1), ResourceStatus::Booked);
        assert_eq!(status(&engine, 2), ResourceStatus::Booked);
        assert_eq!(store.commit_count(), commits);
        assert_eq!(store.reservations()[0].resource_id, ResourceId::new(1));
    }

    #[test]
    fn deregister_cascades_reservations() {
        let (store, mut engine) = setup();
        engine
            .add_reservation(booking(102, 1, (10, 0), (11, 0)), now())
            .unwrap();

        let removed = engine.deregister_resource(ResourceId::new(1)).unwrap();
        assert_eq!(removed, vec![ReservationId::new(100), ReservationId::new(102)]);
        assert!(engine.ledger().is_empty());
        assert!(engine.registry().is_empty());
        assert!(store.reservations().is_empty());
        assert!(store.resources().is_empty());

        assert!(matches!(
            engine.deregister_resource(ResourceId::new(1)),
            Err(EngineError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn register_validates_input() {
        let (_, mut engine) = setup();
        assert!(matches!(
            engine.register_resource(Resource::new(ResourceId::new(1), "Again")),
            Err(EngineError::DuplicateResource(_))
        ));
        assert!(matches!(
            engine.register_resource(Resource::new(ResourceId::new(2), " ")),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.register_resource(
                Resource::new(ResourceId::new(3), "Desk C").with_status(ResourceStatus::Booked)
            ),
            Err(EngineError::Validation(_))
        ));

        engine
            .register_resource(
                Resource::new(ResourceId::new(4), "Studio")
                    .with_kind(ResourceKind::Rated { rating: 9 })
                    .with_status(ResourceStatus::Maintenance),
            )
            .unwrap();
        assert_eq!(status(&engine, 4), ResourceStatus::Maintenance);
    }

    #[test]
    fn explicit_status_must_agree_with_reservations() {
        let (_, mut engine) = setup();
        let id = ResourceId::new(1);

        assert!(matches!(
            engine.set_resource_status(id, ResourceStatus::Available, now()),
            Err(EngineError::Validation(_))
        ));

        let change = engine
            .set_resource_status(id, ResourceStatus::Maintenance, now())
            .unwrap();
        assert_eq!(change.map(|c| c.to), Some(ResourceStatus::Maintenance));

        // Maintenance survives losing the last reservation
        engine
            .remove_reservation(ReservationId::new(100), now())
            .unwrap();
        assert_eq!(status(&engine, 1), ResourceStatus::Maintenance);

        assert!(matches!(
            engine.set_resource_status(id, ResourceStatus::Booked, now()),
            Err(EngineError::Validation(_))
        ));
        engine
            .set_resource_status(id, ResourceStatus::Available, now())
            .unwrap();
        assert_eq!(status(&engine, 1), ResourceStatus::Available);
    }

    #[test]
    fn store_failure_rolls_back_add() {
        let (store, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();
        store.set_fail_writes(true);

        let result = engine.add_reservation(booking(200, 2, (9, 0), (10, 0)), now());
        assert!(matches!(result, Err(EngineError::Store(_))));
        assert!(engine.reservation(ReservationId::new(200)).is_none());
        assert_eq!(status(&engine, 2), ResourceStatus::Available);
        assert_eq!(store.reservations().len(), 1);
    }

    #[test]
    fn store_failure_rolls_back_deregister() {
        let (store, mut engine) = setup();
        store.set_fail_writes(true);

        assert!(matches!(
            engine.deregister_resource(ResourceId::new(1)),
            Err(EngineError::Store(_))
        ));
        assert_eq!(status(&engine, 1), ResourceStatus::Booked);
        assert!(engine.reservation(ReservationId::new(100)).is_some());
    }

    #[test]
    fn store_failure_rolls_back_update() {
        let (store, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();
        store.set_fail_writes(true);

        let update = ReservationUpdate {
            resource_id: Some(ResourceId::new(2)),
            ..Default::default()
        };
        assert!(engine
            .update_reservation(ReservationId::new(100), &update, now())
            .is_err());
        assert_eq!(
            engine.reservation(ReservationId::new(100)).unwrap().resource_id,
            ResourceId::new(1)
        );
        assert_eq!(status(&engine, 1), ResourceStatus::Booked);
        assert_eq!(status(&engine, 2), ResourceStatus::Available);
    }

    #[test]
    fn open_repairs_orphans_and_stale_status() {
        let store = Arc::new(MemoryStore::with_records(
            vec![
                Resource::new(ResourceId::new(1), "Desk A"),
                Resource::new(ResourceId::new(2), "Desk B").with_status(ResourceStatus::Booked),
            ],
            vec![booking(100, 1, (9, 0), (10, 0)), booking(300, 9, (9, 0), (10, 0))],
        ));

        let engine =
            ReservationEngine::open(store.clone(), EngineOptions::default(), now()).unwrap();

        assert_eq!(status(&engine, 1), ResourceStatus::Booked);
        assert_eq!(status(&engine, 2), ResourceStatus::Available);
        assert!(engine.reservation(ReservationId::new(300)).is_none());
        assert_eq!(store.reservations().len(), 1);
        assert_eq!(store.resources()[0].status, ResourceStatus::Booked);
    }

    #[test]
    fn open_without_repairs_does_not_write() {
        let store = Arc::new(MemoryStore::with_records(
            vec![Resource::new(ResourceId::new(1), "Desk A")],
            Vec::new(),
        ));
        ReservationEngine::open(store.clone(), EngineOptions::default(), now()).unwrap();
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn listing_filters_by_resource() {
        let (_, mut engine) = setup();
        engine
            .register_resource(Resource::new(ResourceId::new(2), "Desk B"))
            .unwrap();
        engine
            .add_reservation(booking(200, 2, (9, 0), (10, 0)), now())
            .unwrap();

        let all = engine.list_reservations(None, now()).unwrap();
        assert_eq!(all.len(), 2);
        let desk_b = engine
            .list_reservations(Some(ResourceId::new(2)), now())
            .unwrap();
        assert_eq!(desk_b.len(), 1);
        assert_eq!(desk_b[0].id, ReservationId::new(200));
        assert!(matches!(
            engine.list_reservations(Some(ResourceId::new(7)), now()),
            Err(EngineError::ResourceNotFound(_))
        ));
    }
}
