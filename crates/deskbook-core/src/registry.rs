//! Resource registry: the in-memory set of resources and their status

use deskbook_api::{Resource, ResourceStatus};
use deskbook_util::ResourceId;
use std::collections::BTreeMap;

use crate::{EngineError, EngineResult};

/// A status transition on one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub resource_id: ResourceId,
    pub from: ResourceStatus,
    pub to: ResourceStatus,
}

/// Status a resource should carry given whether it has an active reservation.
/// Maintenance is never changed by recomputation.
pub fn derive_status(current: ResourceStatus, has_active_reservation: bool) -> ResourceStatus {
    match (current, has_active_reservation) {
        (ResourceStatus::Maintenance, _) => ResourceStatus::Maintenance,
        (_, true) => ResourceStatus::Booked,
        (_, false) => ResourceStatus::Available,
    }
}

/// Pure state container for resources, ordered by id.
///
/// Holds no reference to reservations; the engine feeds it the facts it
/// needs for status recomputation.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Add a resource. Fails if the id is taken.
    pub fn register(&mut self, resource: Resource) -> EngineResult<()> {
        if self.resources.contains_key(&resource.id) {
            return Err(EngineError::DuplicateResource(resource.id));
        }
        self.resources.insert(resource.id, resource);
        Ok(())
    }

    /// Remove a resource and return it
    pub fn deregister(&mut self, id: ResourceId) -> EngineResult<Resource> {
        self.resources
            .remove(&id)
            .ok_or(EngineError::ResourceNotFound(id))
    }

    /// Overwrite the status, returning the previous one
    pub fn set_status(&mut self, id: ResourceId, status: ResourceStatus) -> EngineResult<ResourceStatus> {
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or(EngineError::ResourceNotFound(id))?;
        Ok(std::mem::replace(&mut resource.status, status))
    }

    /// Re-derive the status from the reservation fact. Returns the change,
    /// if any.
    pub fn recompute_status(
        &mut self,
        id: ResourceId,
        has_active_reservation: bool,
    ) -> EngineResult<Option<StatusChange>> {
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or(EngineError::ResourceNotFound(id))?;

        let from = resource.status;
        let to = derive_status(from, has_active_reservation);
        if from == to {
            return Ok(None);
        }

        resource.status = to;
        Ok(Some(StatusChange {
            resource_id: id,
            from,
            to,
        }))
    }
}

impl FromIterator<Resource> for ResourceRegistry {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}
