//! Last injection failure per tab
//!
//! Entries exist only while a tab is errored; the reconciler clears them as
//! soon as the tab moves to any other state or is cleared.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use tabside_core::{InjectionError, TabId};

/// An injection failure and when it was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub error: InjectionError,
    pub recorded_at: DateTime<Local>,
}

#[derive(Debug, Default)]
pub struct ErrorCache {
    errors: HashMap<TabId, ErrorRecord>,
}

impl ErrorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tab_error(&mut self, tab_id: TabId, error: InjectionError) {
        self.errors.insert(
            tab_id,
            ErrorRecord {
                error,
                recorded_at: Local::now(),
            },
        );
    }

    pub fn get_tab_error(&self, tab_id: TabId) -> Option<&InjectionError> {
        self.errors.get(&tab_id).map(|record| &record.error)
    }

    pub fn unset_tab_error(&mut self, tab_id: TabId) -> Option<ErrorRecord> {
        self.errors.remove(&tab_id)
    }

    /// Keep only the entries whose tab id satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(TabId) -> bool) {
        self.errors.retain(|tab_id, _| keep(*tab_id));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut cache = ErrorCache::new();
        cache.set_tab_error(TabId(42), InjectionError::restricted_url("chrome://newtab"));

        let err = cache.get_tab_error(TabId(42)).unwrap();
        assert_eq!(err, &InjectionError::restricted_url("chrome://newtab"));
        assert!(cache.get_tab_error(TabId(1)).is_none());
    }

    #[test]
    fn test_latest_error_wins() {
        let mut cache = ErrorCache::new();
        cache.set_tab_error(TabId(1), InjectionError::unknown("first"));
        cache.set_tab_error(TabId(1), InjectionError::no_file_access("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get_tab_error(TabId(1)),
            Some(&InjectionError::no_file_access("second"))
        );
    }

    #[test]
    fn test_unset() {
        let mut cache = ErrorCache::new();
        cache.set_tab_error(TabId(1), InjectionError::unknown("boom"));

        let removed = cache.unset_tab_error(TabId(1));
        assert!(removed.is_some());
        assert!(cache.is_empty());
        assert!(cache.unset_tab_error(TabId(1)).is_none());
    }

    #[test]
    fn test_retain() {
        let mut cache = ErrorCache::new();
        cache.set_tab_error(TabId(1), InjectionError::unknown("a"));
        cache.set_tab_error(TabId(2), InjectionError::unknown("b"));

        cache.retain(|id| id == TabId(2));

        assert!(cache.get_tab_error(TabId(1)).is_none());
        assert!(cache.get_tab_error(TabId(2)).is_some());
    }

    #[test]
    fn test_record_timestamp() {
        let before = Local::now();
        let mut cache = ErrorCache::new();
        cache.set_tab_error(TabId(1), InjectionError::unknown("x"));
        let record = cache.unset_tab_error(TabId(1)).unwrap();
        assert!(record.recorded_at >= before);
        assert!(cache.is_empty());
    }
}
