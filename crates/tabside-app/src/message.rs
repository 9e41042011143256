//! Message types for the reconciler (TEA pattern)

use tabside_core::{BrowserEvent, InjectionError, StorageChange, Tab, TabId};

/// Everything that can drive a state transition
#[derive(Debug, Clone)]
pub enum Message {
    /// Tab lifecycle event or action click from the browser
    Browser(BrowserEvent),

    /// The shared persistence medium changed outside this process
    StorageChanged(StorageChange),

    // ─────────────────────────────────────────────────────────
    // Task Completions
    // ─────────────────────────────────────────────────────────
    /// Live tab lookup finished; `tab` is `None` if it no longer exists
    TabLookedUp { tab_id: TabId, tab: Option<Tab> },

    /// Injection port call finished
    InjectionFinished {
        tab_id: TabId,
        attempt: u64,
        result: Result<(), InjectionError>,
    },

    /// Removal port call finished
    RemovalFinished {
        tab_id: TabId,
        attempt: u64,
        result: Result<(), InjectionError>,
    },

    /// Annotation count fetched for the lifecycle stamped `revision`
    AnnotationCountFetched {
        tab_id: TabId,
        revision: u64,
        count: u64,
    },

    /// Stop the engine
    Quit,
}

impl From<BrowserEvent> for Message {
    fn from(event: BrowserEvent) -> Self {
        Message::Browser(event)
    }
}

impl From<StorageChange> for Message {
    fn from(change: StorageChange) -> Self {
        Message::StorageChanged(change)
    }
}
