//! Domain events emitted by the Engine for external consumers
//!
//! Events are broadcast after each message is processed via
//! `Engine::subscribe()`, so subscribers see every transition in order.

use tabside_core::{InjectionError, TabId, TabRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A tab record was created or changed
    TabChanged {
        tab_id: TabId,
        record: TabRecord,
        previous: Option<TabRecord>,
    },

    /// A tab record was dropped
    TabCleared { tab_id: TabId },

    /// Injection failed and the tab is now errored
    InjectionFailed { tab_id: TabId, error: InjectionError },

    /// The help surface was shown for an errored tab
    HelpShown { tab_id: TabId, error: InjectionError },

    /// State was reloaded after another process changed the store
    StoreReloaded { tab_count: usize },
}

impl EngineEvent {
    /// Short label for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::TabChanged { .. } => "tab_changed",
            EngineEvent::TabCleared { .. } => "tab_cleared",
            EngineEvent::InjectionFailed { .. } => "injection_failed",
            EngineEvent::HelpShown { .. } => "help_shown",
            EngineEvent::StoreReloaded { .. } => "store_reloaded",
        }
    }
}
