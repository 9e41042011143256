//! External storage change resync

use tabside_core::prelude::*;
use tabside_core::{StorageChange, TabState};

use crate::engine_event::EngineEvent;
use crate::state::AppState;
use crate::store::{records_from_store, snapshot_matches};

use super::UpdateResult;

/// Reload everything if another process wrote a different tab mapping
pub fn handle_storage_change(state: &mut AppState, change: StorageChange) -> UpdateResult {
    if !change.is_state_key() {
        trace!("Ignoring storage change for key {:?}", change.key);
        return UpdateResult::none();
    }
    if snapshot_matches(state.store.as_ref(), change.new_value.as_deref()) {
        trace!("Storage change matches the current snapshot");
        return UpdateResult::none();
    }

    if let Err(e) = state.store.reload() {
        error!("Failed to reload the state store: {}", e);
        return UpdateResult::none();
    }
    state.tabs.resync(records_from_store(state.store.as_ref()));

    // Errored tabs are never persisted, so only errors of tabs this process
    // still tracks as errored can survive a resync
    let tabs = &state.tabs;
    state
        .errors
        .retain(|tab_id| tabs.get(tab_id).map(|r| r.state) == Some(TabState::Errored));

    let tab_count = state.tabs.len();
    info!("Resynced {} tab(s) from the state store", tab_count);
    UpdateResult::event(EngineEvent::StoreReloaded { tab_count })
}
