use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One logged practice session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
    pub date: DateTime<Utc>,
    /// Minutes.
    pub duration: i32,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl Entry {
    pub fn label_ids(&self) -> Vec<Uuid> {
        self.labels.iter().map(|l| l.id).collect()
    }
}

/// An ordered checklist item within an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub position: i32,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

/// A user-defined category attachable to many entries.
///
/// Entries reference labels by `id` only, so every other field defaults when
/// a label arrives nested inside an entry payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Label {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelDuration {
    pub label_id: Uuid,
    /// Minutes.
    pub duration: i64,
}

/// Fills `children` of every label from the `parent_id` adjacency list.
/// Children keep the order the labels were given in.
pub fn attach_children(labels: &mut [Label]) {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for label in labels.iter() {
        if let Some(parent) = label.parent_id {
            children.entry(parent).or_default().push(label.id);
        }
    }

    for label in labels.iter_mut() {
        label.children = children.remove(&label.id).unwrap_or_default();
    }
}
