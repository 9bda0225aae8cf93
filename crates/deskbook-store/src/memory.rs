//! In-memory store for tests
//!
//! Behaves like `SqliteStore` (missing rows are errors, batches are atomic)
//! and can be told to fail every write, which is how the engine's rollback
//! path is exercised.

use deskbook_api::{Reservation, Resource, ResourceStatus};
use deskbook_util::{ReservationId, ResourceId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{Mutation, Store, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    resources: BTreeMap<ResourceId, Resource>,
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl Tables {
    fn apply(&mut self, mutation: &Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::SaveResource(resource) => {
                self.resources.insert(resource.id, resource.clone());
            }
            Mutation::DeleteResource(id) => {
                self.resources
                    .remove(id)
                    .ok_or_else(|| StoreError::NotFound(format!("resource {id}")))?;
            }
            Mutation::SetResourceStatus { id, status } => {
                let resource = self
                    .resources
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound(format!("resource {id}")))?;
                resource.status = *status;
            }
            Mutation::SaveReservation(reservation) => {
                self.reservations.insert(reservation.id, reservation.clone());
            }
            Mutation::DeleteReservation(id) => {
                self.reservations
                    .remove(id)
                    .ok_or_else(|| StoreError::NotFound(format!("reservation {id}")))?;
            }
        }
        Ok(())
    }
}

/// Mock store for unit and integration testing
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,

    /// Fail every write with a database error
    fail_writes: AtomicBool,

    /// Number of successful commits
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, bypassing the failure switch
    pub fn with_records(resources: Vec<Resource>, reservations: Vec<Reservation>) -> Self {
        let tables = Tables {
            resources: resources.into_iter().map(|r| (r.id, r)).collect(),
            reservations: reservations.into_iter().map(|r| (r.id, r)).collect(),
        };
        Self {
            tables: Mutex::new(tables),
            ..Self::default()
        }
    }

    /// Configure every subsequent write to fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of stored resources, ordered by id
    pub fn resources(&self) -> Vec<Resource> {
        self.tables()
            .map(|t| t.resources.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of stored reservations, ordered by id
    pub fn reservations(&self) -> Vec<Reservation> {
        self.tables()
            .map(|t| t.reservations.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn write(&self, mutation: Mutation) -> StoreResult<()> {
        self.check_writable()?;
        self.tables()?.apply(&mutation)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("mock write failure".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_resources(&self) -> StoreResult<Vec<Resource>> {
        Ok(self.tables()?.resources.values().cloned().collect())
    }

    fn load_reservations(&self) -> StoreResult<Vec<Reservation>> {
        Ok(self.tables()?.reservations.values().cloned().collect())
    }

    fn save_resource(&self, resource: &Resource) -> StoreResult<()> {
        self.write(Mutation::SaveResource(resource.clone()))
    }

    fn delete_resource(&self, id: ResourceId) -> StoreResult<()> {
        self.write(Mutation::DeleteResource(id))
    }

    fn set_resource_status(&self, id: ResourceId, status: ResourceStatus) -> StoreResult<()> {
        self.write(Mutation::SetResourceStatus { id, status })
    }

    fn save_reservation(&self, reservation: &Reservation) -> StoreResult<()> {
        self.write(Mutation::SaveReservation(reservation.clone()))
    }

    fn delete_reservation(&self, id: ReservationId) -> StoreResult<()> {
        self.write(Mutation::DeleteReservation(id))
    }

    fn commit(&self, batch: &[Mutation]) -> StoreResult<()> {
        self.check_writable()?;

        let mut tables = self.tables()?;
        let mut staged = tables.clone();
        for mutation in batch {
            staged.apply(mutation)?;
        }
        *tables = staged;

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.tables.lock().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_writes_leave_tables_untouched() {
        let store = MemoryStore::new();
        store
            .save_resource(&Resource::new(ResourceId::new(1), "Desk A"))
            .unwrap();

        store.set_fail_writes(true);
        assert!(store.delete_resource(ResourceId::new(1)).is_err());
        assert!(store
            .commit(&[Mutation::DeleteResource(ResourceId::new(1))])
            .is_err());
        assert_eq!(store.resources().len(), 1);

        store.set_fail_writes(false);
        store
            .commit(&[Mutation::DeleteResource(ResourceId::new(1))])
            .unwrap();
        assert!(store.resources().is_empty());
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn partial_batch_is_discarded() {
        let store = MemoryStore::new();
        let batch = [
            Mutation::SaveResource(Resource::new(ResourceId::new(1), "Desk A")),
            Mutation::DeleteReservation(ReservationId::new(5)),
        ];

        assert!(matches!(store.commit(&batch), Err(StoreError::NotFound(_))));
        assert!(store.resources().is_empty());
        assert_eq!(store.commit_count(), 0);
    }
}
