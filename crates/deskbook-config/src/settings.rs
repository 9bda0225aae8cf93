//! Validated settings

use crate::schema::{RawConfig, RawResource, RawServiceConfig};
use deskbook_api::{Resource, ResourceKind, ResourceStatus};
use deskbook_util::{default_data_dir, ResourceId, DEFAULT_DATABASE_FILE};
use std::path::PathBuf;

/// Validated settings ready for use by the front end
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub service: ServiceConfig,

    /// Resources to seed, in file order
    pub resources: Vec<Resource>,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            resources: raw.resources.into_iter().map(convert_resource).collect(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub database: String,
    pub log_level: Option<String>,
    pub sweep_before_listing: bool,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            database: raw
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()),
            log_level: raw.log_level,
            sweep_before_listing: raw.sweep_before_listing.unwrap_or(true),
        }
    }

    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

fn convert_resource(raw: RawResource) -> Resource {
    let kind = match raw.rating {
        Some(rating) => ResourceKind::Rated { rating },
        None => ResourceKind::Standard,
    };
    // Validation has already rejected unknown and booked statuses
    let status = raw
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ResourceStatus::Available);

    Resource::new(ResourceId::new(raw.id), raw.name)
        .with_kind(kind)
        .with_status(status)
}
