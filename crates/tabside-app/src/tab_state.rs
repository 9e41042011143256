//! Per-tab state machine
//!
//! [`TabStateMachine`] is the sole owner of [`TabRecord`]s. Every mutation
//! merges a [`TabPatch`] into the current (or default) record and queues a
//! [`TabChange`]. The reconciler drains the queue after each message and runs
//! its side effects for every change in order, so a side effect that mutates
//! the machine again simply queues another change instead of re-entering.

use std::collections::{HashMap, VecDeque};

use tabside_core::prelude::*;
use tabside_core::{TabId, TabPatch, TabRecord, TabState};

/// One transition of one tab, delivered to the change subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabChange {
    pub tab_id: TabId,
    /// `None` when the tab was cleared
    pub current: Option<TabRecord>,
    /// `None` when the tab was untracked before this change
    pub previous: Option<TabRecord>,
}

/// A pending annotation-count refresh for a tab.
///
/// Carries the record revision it was requested at so a completion that
/// arrives after another navigation can be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationCountRequest {
    pub tab_id: TabId,
    pub url: Option<String>,
    pub revision: u64,
}

/// In-memory tab state with change notification
#[derive(Debug, Default)]
pub struct TabStateMachine {
    tabs: HashMap<TabId, TabRecord>,
    changes: VecDeque<TabChange>,
    /// Source of revisions and install attempt ids; never reused
    sequence: u64,
}

impl TabStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every record at once.
    ///
    /// This is a reset, not a transition: no changes are queued, and any
    /// changes still queued from before the load are dropped.
    pub fn load(&mut self, records: HashMap<TabId, TabRecord>) {
        debug!("Loading {} tab record(s)", records.len());
        self.tabs = records;
        self.changes.clear();
    }

    /// Record for `tab_id`, or the default record if it is untracked
    pub fn get_state(&self, tab_id: TabId) -> TabRecord {
        self.tabs
            .get(&tab_id)
            .cloned()
            .unwrap_or_else(|| TabRecord::new(tab_id))
    }

    /// Record for `tab_id` only if it is tracked
    pub fn get(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    /// Replace every record with an externally written snapshot.
    ///
    /// Like [`load`](Self::load), but a tab tracked on both sides keeps its
    /// local revision and any install or removal still in flight, so the
    /// pending port call and annotation fetch still match when they finish.
    pub fn resync(&mut self, mut records: HashMap<TabId, TabRecord>) {
        for (tab_id, record) in records.iter_mut() {
            let Some(local) = self.tabs.get(tab_id) else {
                continue;
            };
            record.revision = local.revision;
            if local.install.is_in_flight() {
                trace!("Tab {} keeps in-flight {:?}", tab_id, local.install);
                record.install = local.install;
            }
        }
        self.load(records);
    }

    /// Merge `patch` into the record for `tab_id` and queue the change
    pub fn set_state(&mut self, tab_id: TabId, patch: TabPatch) -> TabRecord {
        let previous = self.tabs.get(&tab_id).cloned();
        let mut current = previous
            .clone()
            .unwrap_or_else(|| TabRecord::new(tab_id));
        current.apply(&patch);

        trace!("Tab {} patched with {:?}", tab_id, patch);
        self.tabs.insert(tab_id, current.clone());
        self.changes.push_back(TabChange {
            tab_id,
            current: Some(current.clone()),
            previous,
        });
        current
    }

    /// Merge `patch` as the start of a new lifecycle (navigation or
    /// replacement), stamping the record with a fresh revision
    pub fn reset_tab(&mut self, tab_id: TabId, patch: TabPatch) -> TabRecord {
        let revision = self.next_sequence();
        self.set_state(tab_id, patch.revision(revision))
    }

    pub fn activate_tab(&mut self, tab_id: TabId) -> TabRecord {
        self.set_state(tab_id, TabPatch::new().state(TabState::Active))
    }

    pub fn deactivate_tab(&mut self, tab_id: TabId) -> TabRecord {
        self.set_state(tab_id, TabPatch::new().state(TabState::Inactive))
    }

    pub fn error_tab(&mut self, tab_id: TabId) -> TabRecord {
        self.set_state(tab_id, TabPatch::new().state(TabState::Errored))
    }

    /// Drop the record for `tab_id` and queue a change with no current record
    pub fn clear_tab(&mut self, tab_id: TabId) {
        let previous = self.tabs.remove(&tab_id);
        debug!("Tab {} cleared (was tracked: {})", tab_id, previous.is_some());
        self.changes.push_back(TabChange {
            tab_id,
            current: None,
            previous,
        });
    }

    pub fn is_tab_active(&self, tab_id: TabId) -> bool {
        self.get_state(tab_id).state == TabState::Active
    }

    pub fn is_tab_inactive(&self, tab_id: TabId) -> bool {
        self.get_state(tab_id).state == TabState::Inactive
    }

    pub fn is_tab_errored(&self, tab_id: TabId) -> bool {
        self.get_state(tab_id).state == TabState::Errored
    }

    /// Start an annotation-count refresh for the current lifecycle of `tab_id`
    pub fn annotation_count_request(
        &self,
        tab_id: TabId,
        url: Option<String>,
    ) -> AnnotationCountRequest {
        AnnotationCountRequest {
            tab_id,
            url,
            revision: self.get_state(tab_id).revision,
        }
    }

    /// Apply a fetched annotation count.
    ///
    /// Returns `false` without touching anything when the tab is gone or has
    /// been reset since the request was made.
    pub fn apply_annotation_count(&mut self, tab_id: TabId, revision: u64, count: u64) -> bool {
        match self.tabs.get(&tab_id) {
            Some(record) if record.revision == revision => {
                self.set_state(tab_id, TabPatch::new().annotation_count(count));
                true
            }
            Some(record) => {
                debug!(
                    "Dropping stale annotation count for tab {} (revision {} != {})",
                    tab_id, revision, record.revision
                );
                false
            }
            None => {
                debug!("Dropping annotation count for untracked tab {}", tab_id);
                false
            }
        }
    }

    /// Allocate the next revision / install attempt id
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Pop the oldest queued change
    pub fn pop_change(&mut self) -> Option<TabChange> {
        self.changes.pop_front()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Iterate over all tracked records
    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.tabs.values()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
