//! Reconciler state (Model in TEA pattern)

use tabside_core::prelude::*;

use crate::config::Settings;
use crate::error_cache::ErrorCache;
use crate::store::{records_from_store, StateStore};
use crate::tab_state::TabStateMachine;

/// Everything the update function reads and mutates
pub struct AppState {
    pub tabs: TabStateMachine,
    pub errors: ErrorCache,
    pub store: Box<dyn StateStore>,
    pub settings: Settings,
    quitting: bool,
}

impl AppState {
    /// Build state from the store's persisted records
    pub fn new(settings: Settings, store: Box<dyn StateStore>) -> Self {
        let mut tabs = TabStateMachine::new();
        tabs.load(records_from_store(store.as_ref()));
        info!("Restored {} tab(s) from the state store", tabs.len());

        Self {
            tabs,
            errors: ErrorCache::new(),
            store,
            settings,
            quitting: false,
        }
    }

    pub fn request_quit(&mut self) {
        self.quitting = true;
    }

    pub fn should_quit(&self) -> bool {
        self.quitting
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tabs", &self.tabs)
            .field("errors", &self.errors)
            .field("stored", &self.store.all().len())
            .field("settings", &self.settings)
            .field("quitting", &self.quitting)
            .finish()
    }
}
