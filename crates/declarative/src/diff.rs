//! Diff computation for property maps
//!
//! Two maps are compared key by key at the value level: nested objects and
//! arrays are equal when their contents are equal, regardless of how they
//! were serialized. `null` members count as absent.

use crate::property::{PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a single property changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    /// Present only in the new map
    Add,
    /// Present only in the old map
    Delete,
    /// Present in both with different values
    Update,
}

/// Old and new value of an updated property
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDiff {
    pub old: PropertyValue,
    pub new: PropertyValue,
}

/// Key-level differences between two property maps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectDiff {
    /// Keys only in the new map
    pub adds: BTreeMap<String, PropertyValue>,
    /// Keys only in the old map
    pub deletes: BTreeMap<String, PropertyValue>,
    /// Keys in both maps whose values differ
    pub updates: BTreeMap<String, ValueDiff>,
}

impl ObjectDiff {
    /// Compare two maps, returning `None` when nothing changed
    ///
    /// A computed value on the new side always counts as an update, since
    /// nothing proves it will end up equal to the old one.
    pub fn compute(old: &PropertyMap, new: &PropertyMap) -> Option<Self> {
        let mut diff = Self::default();

        for (key, old_value) in old.iter().filter(|(_, v)| !v.is_null()) {
            match new.get(key).filter(|v| !v.is_null()) {
                None => {
                    diff.deletes.insert(key.clone(), old_value.clone());
                }
                Some(new_value) if new_value.contains_computed() || new_value != old_value => {
                    diff.updates.insert(
                        key.clone(),
                        ValueDiff {
                            old: old_value.clone(),
                            new: new_value.clone(),
                        },
                    );
                }
                Some(_) => {}
            }
        }

        for (key, new_value) in new.iter().filter(|(_, v)| !v.is_null()) {
            if !old.contains_key(key) {
                diff.adds.insert(key.clone(), new_value.clone());
            }
        }

        diff.any_changes().then_some(diff)
    }

    pub fn any_changes(&self) -> bool {
        !(self.adds.is_empty() && self.deletes.is_empty() && self.updates.is_empty())
    }

    /// Every changed key with its classification, ordered by key
    pub fn kinds(&self) -> BTreeMap<String, DiffKind> {
        let adds = self.adds.keys().map(|k| (k.clone(), DiffKind::Add));
        let deletes = self.deletes.keys().map(|k| (k.clone(), DiffKind::Delete));
        let updates = self.updates.keys().map(|k| (k.clone(), DiffKind::Update));
        adds.chain(deletes).chain(updates).collect()
    }

    /// Changed keys in order
    pub fn changed_keys(&self) -> Vec<String> {
        self.kinds().into_keys().collect()
    }
}

impl PropertyMap {
    /// Diff `self` (old) against `new`
    pub fn diff(&self, new: &PropertyMap) -> Option<ObjectDiff> {
        ObjectDiff::compute(self, new)
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of properties added
    pub additions: usize,
    /// Number of properties removed
    pub removals: usize,
    /// Number of properties modified
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from an object diff
    pub fn from_diff(diff: &ObjectDiff) -> Self {
        Self {
            additions: diff.adds.len(),
            removals: diff.deletes.len(),
            modifications: diff.updates.len(),
        }
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to add, {} to change, {} to delete",
            self.additions, self.modifications, self.removals
        )
    }
}
