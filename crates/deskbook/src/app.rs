//! Process lifetime: configuration, store, engine and command dispatch

use anyhow::{Context, Result};
use deskbook_api::{Reservation, ReservationUpdate, Resource, ResourceKind, ResourceStatus};
use deskbook_config::{load_config, load_config_or_default, Settings};
use deskbook_core::{EngineOptions, EngineResult, Instant, ReservationEngine};
use deskbook_store::SqliteStore;
use deskbook_util::{default_config_path, format_instant, is_mock_time_active, now_naive};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::output;
use crate::{Args, BookingCommand, Command, ResourceCommand};

/// Default log filter for a command-line tool
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Everything one invocation needs
pub struct App {
    store: Arc<SqliteStore>,
    engine: ReservationEngine,

    /// Reference instant for the whole command
    now: Instant,
}

impl App {
    pub fn start(args: &Args) -> Result<Self> {
        let (config_path, settings) = load_settings(args.config.as_deref())?;

        init_logging(
            args.log_level
                .as_deref()
                .or(settings.service.log_level.as_deref())
                .unwrap_or(DEFAULT_LOG_LEVEL),
        );

        info!(
            config_path = %config_path.display(),
            seed_resources = settings.resources.len(),
            "Configuration loaded"
        );

        let now = now_naive();
        if is_mock_time_active() {
            warn!(now = %format_instant(&now), "Mock time is active");
        }

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.service.data_dir.clone());
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(&settings.service.database);
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        let options = EngineOptions {
            sweep_before_listing: settings.service.sweep_before_listing,
        };
        let mut engine = ReservationEngine::open(store.clone(), options, now)
            .context("Failed to load reservations")?;

        seed_resources(&mut engine, &settings)?;

        Ok(Self { store, engine, now })
    }

    /// Run one command. Engine errors are the user's to read, not fatal.
    pub fn execute(&mut self, command: &Command) -> EngineResult<()> {
        match command {
            Command::Resource(command) => self.resource(command),
            Command::Booking(command) => self.booking(command),
            Command::Sweep => {
                let report = self.engine.sweep(self.now)?;
                println!("{}", output::describe_sweep(&report));
                Ok(())
            }
        }
    }

    fn resource(&mut self, command: &ResourceCommand) -> EngineResult<()> {
        match command {
            ResourceCommand::List => {
                let resources = self.engine.list_resources(self.now)?;
                if resources.is_empty() {
                    println!("No workstations");
                }
                for resource in &resources {
                    println!("{}", output::describe_resource(resource));
                }
            }
            ResourceCommand::Add {
                id,
                name,
                rating,
                maintenance,
            } => {
                let kind = match rating {
                    Some(rating) => ResourceKind::Rated { rating: *rating },
                    None => ResourceKind::Standard,
                };
                let status = if *maintenance {
                    ResourceStatus::Maintenance
                } else {
                    ResourceStatus::Available
                };
                self.engine.register_resource(
                    Resource::new(*id, name.clone())
                        .with_kind(kind)
                        .with_status(status),
                )?;
                println!("Workstation {id} added");
            }
            ResourceCommand::Remove { id } => {
                let removed = self.engine.deregister_resource(*id)?;
                println!(
                    "Workstation {id} removed along with {} booking(s)",
                    removed.len()
                );
            }
            ResourceCommand::Status { id, status } => {
                match self.engine.set_resource_status(*id, *status, self.now)? {
                    Some(change) => println!("{}", output::describe_status_change(&change)),
                    None => println!("Workstation {id} is already {status}"),
                }
            }
        }
        Ok(())
    }

    fn booking(&mut self, command: &BookingCommand) -> EngineResult<()> {
        match command {
            BookingCommand::List { resource } => {
                let reservations = self.engine.list_reservations(*resource, self.now)?;
                if reservations.is_empty() {
                    println!("No bookings");
                }
                for reservation in &reservations {
                    println!("{}", output::describe_reservation(reservation));
                }
            }
            BookingCommand::Add {
                id,
                resource,
                client,
                date,
                start,
                end,
            } => {
                let candidate = Reservation {
                    id: *id,
                    resource_id: *resource,
                    client_name: client.clone(),
                    date: date.clone(),
                    start: *start,
                    end: *end,
                };
                let accepted = self.engine.add_reservation(candidate, self.now)?;
                println!("Booking added: {}", output::describe_reservation(&accepted));
            }
            BookingCommand::Remove { id } => {
                self.engine.remove_reservation(*id, self.now)?;
                println!("Booking {id} removed");
            }
            BookingCommand::Update {
                id,
                resource,
                client,
                date,
                start,
                end,
            } => {
                let update = ReservationUpdate {
                    resource_id: *resource,
                    client_name: client.clone(),
                    date: date.clone(),
                    start: *start,
                    end: *end,
                };
                if update.is_empty() {
                    debug!(reservation_id = %id, "Update with no changes");
                }
                let updated = self.engine.update_reservation(*id, &update, self.now)?;
                println!("Booking updated: {}", output::describe_reservation(&updated));
            }
        }
        Ok(())
    }

    /// Release the engine and close the database
    pub fn shutdown(self) -> Result<()> {
        let Self { store, engine, .. } = self;
        drop(engine);

        match Arc::try_unwrap(store) {
            Ok(store) => store.close().context("Failed to close database")?,
            Err(_) => warn!("Store still shared at shutdown, leaving it to drop"),
        }
        Ok(())
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// An explicit path must load; the default location may be absent
fn load_settings(explicit: Option<&Path>) -> Result<(PathBuf, Settings)> {
    match explicit {
        Some(path) => {
            let settings = load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?;
            Ok((path.to_path_buf(), settings))
        }
        None => {
            let path = default_config_path();
            let settings = load_config_or_default(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?;
            Ok((path, settings))
        }
    }
}

/// Register configured resources the store does not know yet
fn seed_resources(engine: &mut ReservationEngine, settings: &Settings) -> Result<()> {
    for seed in &settings.resources {
        if engine.resource(seed.id).is_some() {
            continue;
        }
        engine
            .register_resource(seed.clone())
            .with_context(|| format!("Failed to seed resource {}", seed.id))?;
        info!(resource_id = %seed.id, "Seeded resource from config");
    }
    Ok(())
}
