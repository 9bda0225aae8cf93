//! Shared types for deskbook

use chrono::NaiveTime;
use deskbook_util::{ReservationId, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Availability status of a resource.
///
/// `Booked` is derived from the reservation ledger; `Maintenance` is an
/// operator override that automatic recomputation never clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    Available,
    Booked,
    Maintenance,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Booked => "booked",
            ResourceStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource status '{0}' (expected available, booked or maintenance)")]
pub struct ParseStatusError(pub String);

impl FromStr for ResourceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(ResourceStatus::Available),
            "booked" => Ok(ResourceStatus::Booked),
            "maintenance" => Ok(ResourceStatus::Maintenance),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// Resource variant. Only display differs between kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    #[default]
    Standard,
    /// Workstation with a performance rating
    Rated { rating: u32 },
}

impl ResourceKind {
    pub fn rating(&self) -> Option<u32> {
        match self {
            ResourceKind::Standard => None,
            ResourceKind::Rated { rating } => Some(*rating),
        }
    }
}

/// A bookable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub status: ResourceStatus,
    #[serde(default)]
    pub kind: ResourceKind,
}

impl Resource {
    /// New standard resource, available
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: ResourceStatus::Available,
            kind: ResourceKind::Standard,
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }
}

/// Hour and minute within a single day, serialized as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Returns `None` unless hour is in 0..=23 and minute in 0..=59
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Fields are range-checked on construction
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minutes_since_midnight()
            .cmp(&other.minutes_since_midnight())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Malformed `HH:MM` text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time '{value}': {message}")]
pub struct ParseTimeError {
    pub value: String,
    pub message: &'static str,
}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |message| ParseTimeError {
            value: s.to_string(),
            message,
        };

        let (hour, minute) = s.trim().split_once(':').ok_or_else(|| err("expected HH:MM"))?;
        let hour: u8 = hour.parse().map_err(|_| err("invalid hour"))?;
        let minute: u8 = minute.parse().map_err(|_| err("invalid minute"))?;

        if hour >= 24 {
            return Err(err("hour must be 0-23"));
        }
        if minute >= 60 {
            return Err(err("minute must be 0-59"));
        }

        Ok(Self { hour, minute })
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseTimeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// A time interval booked against one resource on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource_id: ResourceId,
    pub client_name: String,
    /// Calendar day, `DD-MM-YYYY`
    pub date: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

/// Replacement values for an existing reservation. `None` keeps the old value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationUpdate {
    pub resource_id: Option<ResourceId>,
    pub client_name: Option<String>,
    pub date: Option<String>,
    pub start: Option<TimeOfDay>,
    pub end: Option<TimeOfDay>,
}

impl ReservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.resource_id.is_none()
            && self.client_name.is_none()
            && self.date.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }

    /// Build the full replacement candidate; `current` is left untouched.
    pub fn apply_to(&self, current: &Reservation) -> Reservation {
        Reservation {
            id: current.id,
            resource_id: self.resource_id.unwrap_or(current.resource_id),
            client_name: self
                .client_name
                .clone()
                .unwrap_or_else(|| current.client_name.clone()),
            date: self.date.clone().unwrap_or_else(|| current.date.clone()),
            start: self.start.unwrap_or(current.start),
            end: self.end.unwrap_or(current.end),
        }
    }
}
