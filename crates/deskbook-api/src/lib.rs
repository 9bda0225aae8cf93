//! Domain types shared by every deskbook crate
//!
//! This crate defines the records the engine, the store and the CLI agree on:
//! - Resources and their availability status
//! - Reservations and partial reservation updates
//! - Time of day

mod types;

pub use types::*;
