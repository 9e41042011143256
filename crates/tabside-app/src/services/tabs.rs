//! Live tab lookup port

use tabside_core::{Tab, TabId};

/// Reads the browser's current view of a tab
#[trait_variant::make(TabsPort: Send)]
pub trait LocalTabsPort {
    /// Current snapshot of `tab_id`, or `None` if the tab no longer exists
    async fn get(&self, tab_id: TabId) -> Option<Tab>;
}
