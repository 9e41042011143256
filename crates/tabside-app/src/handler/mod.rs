//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `browser`: Tab lifecycle and action-click handlers
//! - `reconcile`: The change subscriber and port call completions
//! - `storage`: External storage change resync

pub(crate) mod browser;
pub(crate) mod reconcile;
pub(crate) mod storage;
pub(crate) mod update;


use tabside_core::{InjectionError, Tab, TabId, TabRecord};

use crate::engine_event::EngineEvent;

// Re-export main entry point
pub use update::update;

/// Side effects the engine performs after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Refresh the browser-action indicator (runs inline)
    UpdateIndicator { tab_id: TabId, record: TabRecord },

    /// Show help for a failed injection (runs inline)
    ShowHelp { tab: Tab, error: InjectionError },

    /// Look the tab up before evaluating install/remove
    LookupTab { tab_id: TabId },

    /// Inject the sidebar; the record is already `Installing { attempt }`
    Inject { tab: Tab, attempt: u64 },

    /// Remove the sidebar; the record is already `Removing { attempt }`
    Remove { tab: Tab, attempt: u64 },

    /// Refresh the annotation count. A missing `url` is resolved through
    /// the tabs port when the task runs.
    FetchAnnotationCount {
        tab_id: TabId,
        url: Option<String>,
        api_url: String,
        revision: u64,
    },
}

/// Result of processing one message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Actions for the engine to perform, in order
    pub actions: Vec<UpdateAction>,
    /// Events to broadcast to subscribers, in order
    pub events: Vec<EngineEvent>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            actions: vec![action],
            events: Vec::new(),
        }
    }

    pub fn event(event: EngineEvent) -> Self {
        Self {
            actions: Vec::new(),
            events: vec![event],
        }
    }

    pub fn push_action(&mut self, action: UpdateAction) {
        self.actions.push(action);
    }

    pub fn push_event(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.events.is_empty()
    }
}
