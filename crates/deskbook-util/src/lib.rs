//! Shared utilities for deskbook
//!
//! This crate provides:
//! - ID types (ResourceId, ReservationId)
//! - Clock access with a mock override for development
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
