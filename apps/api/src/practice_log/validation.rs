use std::collections::HashSet;

use uuid::Uuid;

use super::models::{Assignment, Entry, Label};
use crate::errors::AppError;

/// Positions must read 0, 1, ..., N-1 in array order.
pub fn validate_assignments(assignments: &[Assignment]) -> Result<(), AppError> {
    for (i, assignment) in assignments.iter().enumerate() {
        if assignment.position != i as i32 {
            return Err(AppError::Validation(
                "assignments must have correct position values, [0, ..., N]".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates an entry for create or full update and collapses duplicate
/// label references.
pub fn validate_entry(entry: &mut Entry) -> Result<(), AppError> {
    let mut problems = Vec::new();
    if entry.duration < 0 {
        problems.push("duration must not be negative");
    }
    if entry.message.trim().is_empty() {
        problems.push("message is required");
    }
    if entry.labels.is_empty() {
        problems.push("at least one label is required");
    }
    if !problems.is_empty() {
        return Err(AppError::Validation(problems.join(", ")));
    }

    validate_assignments(&entry.assignments)?;

    let mut seen = HashSet::new();
    entry.labels.retain(|l| seen.insert(l.id));
    Ok(())
}

pub fn validate_label(label: &Label) -> Result<(), AppError> {
    if label.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if label.parent_id == Some(label.id) {
        return Err(AppError::Validation(
            "a label cannot be its own parent".to_string(),
        ));
    }
    Ok(())
}

/// Path and payload must name the same record.
pub fn ensure_ids_match(path_id: Uuid, body_id: Uuid, kind: &str) -> Result<(), AppError> {
    if path_id != body_id {
        return Err(AppError::Validation(format!(
            "payload {kind} ID does not match with path {kind} ID"
        )));
    }
    Ok(())
}
