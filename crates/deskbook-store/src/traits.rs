//! Store trait definitions

use deskbook_api::{Reservation, Resource, ResourceStatus};
use deskbook_util::{ReservationId, ResourceId};

use crate::StoreResult;

/// One write against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SaveResource(Resource),
    DeleteResource(ResourceId),
    SetResourceStatus {
        id: ResourceId,
        status: ResourceStatus,
    },
    /// Insert or replace
    SaveReservation(Reservation),
    DeleteReservation(ReservationId),
}

/// Durable store for resources and reservations.
///
/// The engine reads everything once at startup and afterwards only writes.
pub trait Store: Send + Sync {
    // Startup

    /// Load every resource
    fn load_resources(&self) -> StoreResult<Vec<Resource>>;

    /// Load every reservation
    fn load_reservations(&self) -> StoreResult<Vec<Reservation>>;

    // Resources

    /// Insert or replace a resource
    fn save_resource(&self, resource: &Resource) -> StoreResult<()>;

    /// Delete a resource
    fn delete_resource(&self, id: ResourceId) -> StoreResult<()>;

    /// Overwrite a resource's status
    fn set_resource_status(&self, id: ResourceId, status: ResourceStatus) -> StoreResult<()>;

    // Reservations

    /// Insert or replace a reservation
    fn save_reservation(&self, reservation: &Reservation) -> StoreResult<()>;

    /// Delete a reservation
    fn delete_reservation(&self, id: ReservationId) -> StoreResult<()>;

    // Batches

    /// Apply all mutations or none of them
    fn commit(&self, batch: &[Mutation]) -> StoreResult<()>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
