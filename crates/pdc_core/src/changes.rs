//! Field-level change auditing.
//!
//! Every write operation collects the before/after exports of the rows it
//! touches in a [`ChangeRecorder`]. At commit time the collected changes are
//! written as a single changeset in the same transaction; an empty recorder
//! writes nothing.

use chrono::Utc;
use serde_json::Value;

use crate::types::{Change, NewChangeset};

/// A row whose changes are audited.
pub trait Tracked {
    /// Lowercase model name stored in `Change::resource`.
    const RESOURCE: &'static str;

    fn resource_id(&self) -> i64;

    /// JSON export compared and stored on every change.
    fn export(&self) -> Value;
}

#[derive(Debug, Default)]
pub struct ChangeRecorder {
    changes: Vec<Change>,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created<T: Tracked>(&mut self, row: &T) {
        self.push::<T>(row.resource_id(), Value::Null, row.export());
    }

    /// Records nothing when both exports are equal.
    pub fn updated<T: Tracked>(&mut self, old: &T, new: &T) {
        let (before, after) = (old.export(), new.export());
        if before != after {
            self.push::<T>(new.resource_id(), before, after);
        }
    }

    pub fn deleted<T: Tracked>(&mut self, row: &T) {
        self.push::<T>(row.resource_id(), row.export(), Value::Null);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Turn the collected changes into a changeset, `None` when empty.
    pub fn into_changeset(self, author: &str, comment: Option<&str>) -> Option<NewChangeset> {
        if self.changes.is_empty() {
            return None;
        }
        Some(NewChangeset {
            author: author.to_string(),
            comment: comment.map(str::to_string),
            committed_on: Utc::now(),
            changes: self.changes,
        })
    }

    fn push<T: Tracked>(&mut self, resource_id: i64, old: Value, new: Value) {
        self.changes.push(Change {
            resource: T::RESOURCE.to_string(),
            resource_id,
            old_value: old.to_string(),
            new_value: new.to_string(),
        });
    }
}
