//! Human-readable rendering of engine results

use deskbook_api::{Reservation, Resource, ResourceKind};
use deskbook_core::{StatusChange, SweepReport};

/// One resource, plus a rating line for rated resources
pub fn describe_resource(resource: &Resource) -> String {
    let mut line = format!(
        "ID: {}, Name: {}, Status: {}",
        resource.id, resource.name, resource.status
    );
    if let ResourceKind::Rated { rating } = resource.kind {
        line.push_str(&format!("\n  Performance rating: {rating}"));
    }
    line
}

pub fn describe_reservation(reservation: &Reservation) -> String {
    format!(
        "Booking ID: {}, Resource: {}, Client: {}, Date: {}, {}-{}",
        reservation.id,
        reservation.resource_id,
        reservation.client_name,
        reservation.date,
        reservation.start,
        reservation.end
    )
}

pub fn describe_status_change(change: &StatusChange) -> String {
    format!(
        "Resource {}: {} -> {}",
        change.resource_id, change.from, change.to
    )
}

pub fn describe_sweep(report: &SweepReport) -> String {
    if report.is_empty() {
        return "Nothing to sweep".to_string();
    }

    let ids: Vec<String> = report.expired_ids.iter().map(|id| id.to_string()).collect();
    let mut lines = vec![format!(
        "Removed {} expired booking(s): {}",
        ids.len(),
        ids.join(", ")
    )];
    lines.extend(report.status_changes.iter().map(describe_status_change));
    lines.join("\n")
}
