//! Reservation consistency engine for deskbook
//!
//! This crate is the heart of deskbook, containing:
//! - Interval model (date + half-open time range, overlap, expiry)
//! - Resource registry (status container)
//! - Reservation ledger (conflict detection and validation)
//! - Expiration sweeper
//! - The engine that keeps registry, ledger and store consistent

mod engine;
mod error;
mod interval;
mod ledger;
mod registry;
mod sweeper;
mod txn;

pub use engine::*;
pub use error::*;
pub use interval::*;
pub use ledger::*;
pub use registry::*;
pub use sweeper::*;
