//! Inbound browser event definitions

use serde::{Deserialize, Serialize};

use crate::types::TabId;

/// Logical storage key under which the tab state mapping is persisted
pub const STATE_STORAGE_KEY: &str = "state";

/// Navigation status reported by the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Live tab snapshot as delivered by the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<TabStatus>,
}

impl Tab {
    pub fn new(id: TabId) -> Self {
        Self {
            id,
            url: None,
            status: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: TabStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the tab has finished loading
    pub fn is_complete(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }
}

/// Tab lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// A tab was opened
    Created { tab: Tab },

    /// A tab changed; only `status` changes are acted upon
    Updated {
        tab_id: TabId,
        #[serde(default)]
        status: Option<TabStatus>,
        tab: Tab,
    },

    /// The browser swapped `removed` for `added` (e.g. prerendering)
    Replaced { added: TabId, removed: TabId },

    /// A tab was closed
    Removed { tab_id: TabId },

    /// The user clicked the browser action while `tab` was focused
    ActionClicked { tab: Tab },
}

impl BrowserEvent {
    /// The tab id this event is primarily about
    pub fn tab_id(&self) -> TabId {
        match self {
            BrowserEvent::Created { tab } | BrowserEvent::ActionClicked { tab } => tab.id,
            BrowserEvent::Updated { tab_id, .. } | BrowserEvent::Removed { tab_id } => *tab_id,
            BrowserEvent::Replaced { added, .. } => *added,
        }
    }
}

/// Notification that the shared persistence medium changed outside this process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    pub key: String,
    #[serde(default)]
    pub new_value: Option<String>,
}

impl StorageChange {
    pub fn new(key: impl Into<String>, new_value: Option<String>) -> Self {
        Self {
            key: key.into(),
            new_value,
        }
    }

    /// A change to the tab state mapping
    pub fn state(new_value: impl Into<String>) -> Self {
        Self::new(STATE_STORAGE_KEY, Some(new_value.into()))
    }

    pub fn is_state_key(&self) -> bool {
        self.key == STATE_STORAGE_KEY
    }
}
