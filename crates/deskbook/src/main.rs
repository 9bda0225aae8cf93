//! deskbook - workstation booking without double-booking
//!
//! Command-line entry point. It wires together:
//! - Configuration loading
//! - Store initialization
//! - The reservation engine
//! - Output rendering

mod app;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use deskbook_api::{ResourceStatus, TimeOfDay};
use deskbook_util::{ReservationId, ResourceId, DESKBOOK_DATA_DIR_ENV};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::app::App;

/// deskbook - workstation booking without double-booking
#[derive(Parser, Debug)]
#[command(name = "deskbook", version)]
#[command(about = "Book workstations without double-booking", long_about = None)]
struct Args {
    /// Configuration file path, which must exist when given
    /// (default: ~/.config/deskbook/config.toml, skipped if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory override (or set DESKBOOK_DATA_DIR env var)
    #[arg(short, long, env = DESKBOOK_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Log level (default: from config, otherwise "warn")
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage workstations
    #[command(subcommand)]
    Resource(ResourceCommand),

    /// Manage bookings
    #[command(subcommand)]
    Booking(BookingCommand),

    /// Remove bookings that have already ended
    Sweep,
}

#[derive(Subcommand, Debug)]
enum ResourceCommand {
    /// List all workstations
    List,

    /// Add a workstation
    Add {
        id: ResourceId,
        name: String,

        /// Performance rating, for special workstations
        #[arg(long)]
        rating: Option<u32>,

        /// Start out in maintenance
        #[arg(long)]
        maintenance: bool,
    },

    /// Remove a workstation and all of its bookings
    Remove { id: ResourceId },

    /// Set a workstation's status (available, booked, maintenance)
    Status { id: ResourceId, status: ResourceStatus },
}

#[derive(Subcommand, Debug)]
enum BookingCommand {
    /// List bookings
    List {
        /// Only bookings for this workstation
        #[arg(long)]
        resource: Option<ResourceId>,
    },

    /// Book a workstation
    Add {
        id: ReservationId,

        #[arg(long)]
        resource: ResourceId,

        #[arg(long)]
        client: String,

        /// Day of the booking, DD-MM-YYYY
        #[arg(long)]
        date: String,

        /// Start time, HH:MM
        #[arg(long)]
        start: TimeOfDay,

        /// End time, HH:MM
        #[arg(long)]
        end: TimeOfDay,
    },

    /// Cancel a booking
    Remove { id: ReservationId },

    /// Change fields of a booking
    Update {
        id: ReservationId,

        #[arg(long)]
        resource: Option<ResourceId>,

        #[arg(long)]
        client: Option<String>,

        /// Day of the booking, DD-MM-YYYY
        #[arg(long)]
        date: Option<String>,

        /// Start time, HH:MM
        #[arg(long)]
        start: Option<TimeOfDay>,

        /// End time, HH:MM
        #[arg(long)]
        end: Option<TimeOfDay>,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut app = App::start(&args)?;
    let outcome = app.execute(&args.command);
    app.shutdown()?;

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::from(1))
        }
    }
}
