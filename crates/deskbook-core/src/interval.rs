//! Interval model: a calendar day plus a half-open `[start, end)` time range

use chrono::{NaiveDate, NaiveDateTime};
use deskbook_api::{Reservation, TimeOfDay};
use deskbook_util::DATE_FORMAT;
use thiserror::Error;

/// A comparable point on the single local clock
pub type Instant = NaiveDateTime;

/// The date string does not name a calendar day in `DD-MM-YYYY` form.
///
/// Callers treat this as "expiry unknown", never as "in the past".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{date}' is not a DD-MM-YYYY calendar day")]
pub struct Unrepresentable {
    pub date: String,
}

/// Parse a reservation date
pub fn parse_date(date: &str) -> Result<NaiveDate, Unrepresentable> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|_| Unrepresentable {
        date: date.to_string(),
    })
}

/// Combine a date and a time of day into one instant
pub fn to_instant(date: &str, time: TimeOfDay) -> Result<Instant, Unrepresentable> {
    parse_date(date).map(|day| day.and_time(time.to_naive_time()))
}

/// Half-open overlap: back-to-back ranges do not overlap
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// True iff the combined instant is strictly earlier than `reference`.
/// An unrepresentable instant is never before anything.
pub fn is_before(date: &str, time: TimeOfDay, reference: Instant) -> bool {
    to_instant(date, time).is_ok_and(|instant| instant < reference)
}

/// Whether two date strings name the same calendar day. Unparseable dates
/// only match their exact text.
pub fn same_day(a: &str, b: &str) -> bool {
    match (parse_date(a), parse_date(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// End instant of a reservation
pub fn end_instant(reservation: &Reservation) -> Result<Instant, Unrepresentable> {
    to_instant(&reservation.date, reservation.end)
}

/// A reservation has expired once its end instant is strictly before `now`
pub fn is_expired(reservation: &Reservation, now: Instant) -> bool {
    is_before(&reservation.date, reservation.end, now)
}

/// Two reservations collide when they share resource and day and their
/// time ranges overlap.
pub fn collides(a: &Reservation, b: &Reservation) -> bool {
    a.resource_id == b.resource_id
        && same_day(&a.date, &b.date)
        && overlaps(a.start, a.end, b.start, b.end)
}
