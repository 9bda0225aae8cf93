//! Reservation ledger: the authoritative in-memory set of reservations

use deskbook_api::Reservation;
use deskbook_util::{ReservationId, ResourceId};
use std::collections::BTreeMap;

use crate::interval::{self, Instant};
use crate::{EngineError, EngineResult, ResourceRegistry};

/// Reservations keyed and iterated by id
#[derive(Debug, Clone, Default)]
pub struct ReservationLedger {
    reservations: BTreeMap<ReservationId, Reservation>,
}

impl ReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    pub fn contains(&self, id: ReservationId) -> bool {
        self.reservations.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Reservations targeting one resource
    pub fn for_resource(&self, resource_id: ResourceId) -> impl Iterator<Item = &Reservation> {
        self.reservations
            .values()
            .filter(move |r| r.resource_id == resource_id)
    }

    /// First reservation (in id order) that collides with `candidate`.
    /// `exclude` skips the reservation being replaced.
    pub fn find_conflict(
        &self,
        candidate: &Reservation,
        exclude: Option<ReservationId>,
    ) -> Option<ReservationId> {
        self.reservations
            .values()
            .filter(|existing| Some(existing.id) != exclude)
            .find(|existing| interval::collides(existing, candidate))
            .map(|existing| existing.id)
    }

    /// Full acceptance check for a new or replacement reservation.
    ///
    /// `replacing` names the reservation the candidate supersedes; it is
    /// left out of the conflict scan.
    pub fn validate(
        &self,
        candidate: &Reservation,
        registry: &ResourceRegistry,
        now: Instant,
        replacing: Option<ReservationId>,
    ) -> EngineResult<()> {
        if candidate.client_name.trim().is_empty() {
            return Err(EngineError::validation("client name cannot be empty"));
        }

        if candidate.start >= candidate.end {
            return Err(EngineError::validation(format!(
                "start {} must be before end {}",
                candidate.start, candidate.end
            )));
        }

        if !registry.contains(candidate.resource_id) {
            return Err(EngineError::ResourceNotFound(candidate.resource_id));
        }

        interval::parse_date(&candidate.date)
            .map_err(|e| EngineError::validation(e.to_string()))?;

        if interval::is_expired(candidate, now) {
            return Err(EngineError::validation(format!(
                "reservation ending {} {} is already in the past",
                candidate.date, candidate.end
            )));
        }

        if let Some(conflicting_id) = self.find_conflict(candidate, replacing) {
            return Err(EngineError::Conflict { conflicting_id });
        }

        Ok(())
    }

    /// Whether any reservation on the resource has not yet ended
    pub fn has_active(&self, resource_id: ResourceId, now: Instant) -> bool {
        self.for_resource(resource_id)
            .any(|r| !interval::is_expired(r, now))
    }

    /// Ids of reservations whose end instant is known and before `now`
    pub fn expired(&self, now: Instant) -> Vec<ReservationId> {
        self.reservations
            .values()
            .filter(|r| interval::is_expired(r, now))
            .map(|r| r.id)
            .collect()
    }

    /// Insert or replace, returning the replaced reservation
    pub fn insert(&mut self, reservation: Reservation) -> Option<Reservation> {
        self.reservations.insert(reservation.id, reservation)
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        self.reservations.remove(&id)
    }
}

impl FromIterator<Reservation> for ReservationLedger {
    fn from_iter<I: IntoIterator<Item = Reservation>>(iter: I) -> Self {
        Self {
            reservations: iter.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use deskbook_api::{Resource, TimeOfDay};

    fn now() -> Instant {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn booking(id: i64, start: (u8, u8), end: (u8, u8)) -> Reservation {
        Reservation {
            id: ReservationId::new(id),
            resource_id: ResourceId::new(1),
            client_name: "Ann".into(),
            date: "10-06-2025".into(),
            start: TimeOfDay::new(start.0, start.1).unwrap(),
            end: TimeOfDay::new(end.0, end.1).unwrap(),
        }
    }

    fn registry() -> ResourceRegistry {
        [Resource::new(ResourceId::new(1), "Desk A")]
            .into_iter()
            .collect()
    }

    fn ledger_with_a() -> ReservationLedger {
        [booking(100, (9, 0), (10, 0))].into_iter().collect()
    }

    #[test]
    fn overlapping_candidate_reports_witness() {
        let ledger = ledger_with_a();
        let result = ledger.validate(&booking(101, (9, 30), (10, 30)), &registry(), now(), None);
        assert!(matches!(
            result,
            Err(EngineError::Conflict { conflicting_id }) if conflicting_id == ReservationId::new(100)
        ));
    }

    #[test]
    fn back_to_back_is_accepted() {
        let ledger = ledger_with_a();
        ledger
            .validate(&booking(102, (10, 0), (11, 0)), &registry(), now(), None)
            .unwrap();
    }

    #[test]
    fn replacement_ignores_its_prior_self() {
        let ledger = ledger_with_a();
        let widened = booking(100, (8, 30), (10, 30));
        assert!(ledger.validate(&widened, &registry(), now(), None).is_err());
        ledger
            .validate(&widened, &registry(), now(), Some(ReservationId::new(100)))
            .unwrap();
    }

    #[test]
    fn inverted_and_empty_intervals_are_rejected() {
        let ledger = ReservationLedger::new();
        for candidate in [booking(1, (10, 0), (9, 0)), booking(2, (10, 0), (10, 0))] {
            assert!(matches!(
                ledger.validate(&candidate, &registry(), now(), None),
                Err(EngineError::Validation(_))
            ));
        }
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let mut candidate = booking(1, (9, 0), (10, 0));
        candidate.resource_id = ResourceId::new(7);
        assert!(matches!(
            ReservationLedger::new().validate(&candidate, &registry(), now(), None),
            Err(EngineError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn malformed_date_and_blank_client_are_rejected() {
        let ledger = ReservationLedger::new();

        let mut bad_date = booking(1, (9, 0), (10, 0));
        bad_date.date = "2025-06-10".into();
        assert!(matches!(
            ledger.validate(&bad_date, &registry(), now(), None),
            Err(EngineError::Validation(_))
        ));

        let mut blank = booking(2, (9, 0), (10, 0));
        blank.client_name = "  ".into();
        assert!(matches!(
            ledger.validate(&blank, &registry(), now(), None),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn past_end_is_rejected_but_ending_now_is_not() {
        let ledger = ReservationLedger::new();
        let late = NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let ended = booking(1, (8, 0), (9, 59));
        assert!(ledger.validate(&ended, &registry(), late, None).is_err());

        let ending_now = booking(2, (9, 0), (10, 0));
        ledger.validate(&ending_now, &registry(), late, None).unwrap();
    }

    #[test]
    fn active_and_expired_partition_by_end() {
        let ledger: ReservationLedger = [
            booking(100, (9, 0), (10, 0)),
            booking(101, (11, 0), (12, 0)),
        ]
        .into_iter()
        .collect();
        let at_half_ten = NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();

        assert_eq!(ledger.expired(at_half_ten), vec![ReservationId::new(100)]);
        assert!(ledger.has_active(ResourceId::new(1), at_half_ten));
        assert!(!ledger.has_active(ResourceId::new(2), at_half_ten));
    }
}
