// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted queue aggregate.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MediaHookError;
use crate::item::MediaItem;
use crate::types::MediaStatus;

/// Current on-disk document format.
pub const DOCUMENT_VERSION: u32 = 1;

/// Every tracked media item, the dedup index, and the pull-mode poll cursor.
///
/// The dedup index is written out for inspection but never read back: on
/// deserialization it is rebuilt from `items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersistedDocument")]
pub struct QueueDocument {
    pub version: u32,
    /// Highest platform update id consumed by pull mode.
    pub last_update_offset: Option<i64>,
    items: Vec<MediaItem>,
    known_ids: BTreeSet<String>,
}

#[derive(Deserialize)]
struct PersistedDocument {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    last_update_offset: Option<i64>,
    #[serde(default)]
    items: Vec<MediaItem>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

impl From<PersistedDocument> for QueueDocument {
    fn from(raw: PersistedDocument) -> Self {
        let mut doc = QueueDocument {
            version: raw.version,
            last_update_offset: raw.last_update_offset,
            items: Vec::with_capacity(raw.items.len()),
            known_ids: BTreeSet::new(),
        };
        for item in raw.items {
            if doc.known_ids.contains(&item.id) {
                warn!(item_id = %item.id, "dropping duplicate item id from queue document");
                continue;
            }
            doc.known_ids.insert(item.id.clone());
            doc.items.push(item);
        }
        doc
    }
}

impl Default for QueueDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            last_update_offset: None,
            items: Vec::new(),
            known_ids: BTreeSet::new(),
        }
    }
}

impl QueueDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in arrival order.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// The dedup index.
    pub fn known_ids(&self) -> &BTreeSet<String> {
        &self.known_ids
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known_ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|item| item.id == id)
    }

    /// Mutable access to an item, or `NotFound`.
    pub fn item_mut(&mut self, id: &str) -> Result<&mut MediaItem, MediaHookError> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| MediaHookError::NotFound { id: id.to_string() })
    }

    /// Appends an item unless its id is already known. Returns whether it was added.
    pub fn insert(&mut self, item: MediaItem) -> bool {
        if !self.known_ids.insert(item.id.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes every item matching `predicate`, keeping the index in step.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<MediaItem>
    where
        F: FnMut(&MediaItem) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.items).into_iter().partition(|i| predicate(i));
        self.items = kept;
        for item in &removed {
            self.known_ids.remove(&item.id);
        }
        removed
    }

    /// Iterates over items in the given state, oldest first.
    pub fn with_status(&self, status: MediaStatus) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(move |item| item.status == status)
    }

    /// Iterates mutably over items in the given state, oldest first.
    pub fn with_status_mut(
        &mut self,
        status: MediaStatus,
    ) -> impl Iterator<Item = &mut MediaItem> {
        self.items.iter_mut().filter(move |item| item.status == status)
    }

    /// Item count per status; every status is present, possibly with zero.
    pub fn counts(&self) -> BTreeMap<MediaStatus, usize> {
        let mut counts: BTreeMap<MediaStatus, usize> =
            MediaStatus::ALL.iter().map(|&s| (s, 0)).collect();
        for item in &self.items {
            *counts.entry(item.status).or_default() += 1;
        }
        counts
    }

    /// Moves the poll cursor forward. The cursor never moves backwards.
    pub fn advance_cursor(&mut self, update_id: i64) {
        self.last_update_offset = Some(match self.last_update_offset {
            Some(current) => current.max(update_id),
            None => update_id,
        });
    }
}
