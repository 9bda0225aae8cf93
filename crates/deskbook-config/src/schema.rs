//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Resources to register when absent from the store
    #[serde(default)]
    pub resources: Vec<RawResource>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Directory holding the database
    pub data_dir: Option<PathBuf>,

    /// Database file name inside `data_dir` (default: deskbook.db)
    pub database: Option<String>,

    /// Default log filter, e.g. "info" or "deskbook_core=debug"
    pub log_level: Option<String>,

    /// Sweep expired reservations before every listing (default: true)
    pub sweep_before_listing: Option<bool>,
}

/// Seed resource definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawResource {
    pub id: i64,

    /// Display name
    pub name: String,

    /// Performance rating; makes this a rated resource
    pub rating: Option<u32>,

    /// Initial status, "available" or "maintenance"
    pub status: Option<String>,
}
