//! Configuration validation

use crate::schema::{RawConfig, RawResource};
use deskbook_api::ResourceStatus;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Resource {resource_id}: {message}")]
    ResourceError { resource_id: i64, message: String },

    #[error("Duplicate resource ID: {0}")]
    DuplicateResourceId(i64),

    #[error("Service config error: {0}")]
    ServiceError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(database) = &config.service.database
        && database.trim().is_empty()
    {
        errors.push(ValidationError::ServiceError(
            "database file name cannot be empty".into(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for resource in &config.resources {
        if !seen_ids.insert(resource.id) {
            errors.push(ValidationError::DuplicateResourceId(resource.id));
        }
    }

    for resource in &config.resources {
        errors.extend(validate_resource(resource));
    }

    errors
}

fn validate_resource(resource: &RawResource) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let error = |message: String| ValidationError::ResourceError {
        resource_id: resource.id,
        message,
    };

    if resource.name.trim().is_empty() {
        errors.push(error("name cannot be empty".into()));
    }

    if let Some(status) = &resource.status {
        match status.parse::<ResourceStatus>() {
            Ok(ResourceStatus::Booked) => {
                errors.push(error("seed status cannot be booked".into()));
            }
            Ok(_) => {}
            Err(e) => errors.push(error(e.to_string())),
        }
    }

    errors
}
