//! Change subscriber and port call completions
//!
//! The subscriber runs once per queued [`TabChange`]. It keeps the action
//! indicator, the store and the error cache in line with the record, and
//! asks for a live tab lookup whenever the record's state and install
//! status disagree. The install/remove decision itself is taken only once
//! the lookup confirms the tab has finished loading.

use tabside_core::prelude::*;
use tabside_core::{InjectionError, InstallStatus, Tab, TabId, TabPatch, TabRecord, TabState};

use crate::engine_event::EngineEvent;
use crate::state::AppState;
use crate::tab_state::TabChange;

use super::{UpdateAction, UpdateResult};

/// Run the subscriber for every queued change, including changes the
/// subscriber itself queues
pub fn drain_changes(state: &mut AppState, result: &mut UpdateResult) {
    while let Some(change) = state.tabs.pop_change() {
        on_tab_change(state, change, result);
    }
}

fn on_tab_change(state: &mut AppState, change: TabChange, result: &mut UpdateResult) {
    let TabChange {
        tab_id,
        current,
        previous,
    } = change;

    let Some(current) = current else {
        unpersist(state, tab_id);
        state.errors.unset_tab_error(tab_id);
        result.push_event(EngineEvent::TabCleared { tab_id });
        return;
    };

    result.push_action(UpdateAction::UpdateIndicator {
        tab_id,
        record: current.clone(),
    });

    if current.state == TabState::Errored {
        // The error record stays until the tab leaves ERRORED
        unpersist(state, tab_id);
    } else {
        persist(state, &current);
        state.errors.unset_tab_error(tab_id);
        if needs_reconcile(&current) {
            result.push_action(UpdateAction::LookupTab { tab_id });
        }
    }

    result.push_event(EngineEvent::TabChanged {
        tab_id,
        record: current,
        previous,
    });
}

/// Whether the record's state and install status disagree in a way a port
/// call (or adopting an existing overlay) can settle
pub fn needs_reconcile(record: &TabRecord) -> bool {
    matches!(
        (record.state, record.install),
        (TabState::Active, InstallStatus::NotInstalled)
            | (TabState::Active, InstallStatus::RemovalFailed)
            | (TabState::Inactive, InstallStatus::Installed)
    )
}

fn persist(state: &mut AppState, record: &TabRecord) {
    if let Err(e) = state.store.set(record.id, record.to_persisted()) {
        error!("Failed to persist tab {}: {}", record.id, e);
    }
}

fn unpersist(state: &mut AppState, tab_id: TabId) {
    if let Err(e) = state.store.unset(tab_id) {
        error!("Failed to drop persisted tab {}: {}", tab_id, e);
    }
}

/// Evaluate install/remove against the live tab
pub fn handle_tab_looked_up(state: &mut AppState, tab_id: TabId, tab: Option<Tab>) -> UpdateResult {
    let Some(tab) = tab else {
        debug!("Tab {} no longer exists, skipping reconcile", tab_id);
        return UpdateResult::none();
    };
    if !tab.is_complete() {
        trace!("Tab {} still loading, deferring reconcile", tab_id);
        return UpdateResult::none();
    }
    let Some(record) = state.tabs.get(tab_id) else {
        debug!("Tab {} cleared before lookup finished", tab_id);
        return UpdateResult::none();
    };

    match (record.state, record.install) {
        (TabState::Active, InstallStatus::NotInstalled) => {
            let attempt = state.tabs.next_sequence();
            info!("Injecting sidebar into tab {} (attempt {})", tab_id, attempt);
            state.tabs.set_state(
                tab_id,
                TabPatch::new().install(InstallStatus::Installing { attempt }),
            );
            UpdateResult::action(UpdateAction::Inject { tab, attempt })
        }
        (TabState::Active, InstallStatus::RemovalFailed) => {
            debug!("Tab {} still has its sidebar, adopting it", tab_id);
            state
                .tabs
                .set_state(tab_id, TabPatch::new().install(InstallStatus::Installed));
            UpdateResult::none()
        }
        (TabState::Inactive, InstallStatus::Installed) => {
            let attempt = state.tabs.next_sequence();
            info!("Removing sidebar from tab {} (attempt {})", tab_id, attempt);
            state.tabs.set_state(
                tab_id,
                TabPatch::new().install(InstallStatus::Removing { attempt }),
            );
            UpdateResult::action(UpdateAction::Remove { tab, attempt })
        }
        _ => UpdateResult::none(),
    }
}

pub fn handle_injection_finished(
    state: &mut AppState,
    tab_id: TabId,
    attempt: u64,
    result: std::result::Result<(), InjectionError>,
) -> UpdateResult {
    let Some(record) = state.tabs.get(tab_id) else {
        debug!("Injection into cleared tab {} finished, ignoring", tab_id);
        return UpdateResult::none();
    };
    if record.install != (InstallStatus::Installing { attempt }) {
        debug!(
            "Stale injection result for tab {} (attempt {}, now {:?})",
            tab_id, attempt, record.install
        );
        return UpdateResult::none();
    }
    let still_active = record.state == TabState::Active;

    match result {
        Ok(()) => {
            info!("Sidebar injected into tab {}", tab_id);
            state
                .tabs
                .set_state(tab_id, TabPatch::new().install(InstallStatus::Installed));
            UpdateResult::none()
        }
        Err(error) if still_active => {
            warn!("Injection into tab {} failed: {}", tab_id, error);
            state.errors.set_tab_error(tab_id, error.clone());
            state.tabs.set_state(
                tab_id,
                TabPatch::new()
                    .state(TabState::Errored)
                    .install(InstallStatus::NotInstalled),
            );
            UpdateResult::event(EngineEvent::InjectionFailed { tab_id, error })
        }
        Err(error) => {
            // Deactivated while the call was in flight; nothing to surface
            debug!(
                "Injection into tab {} failed after deactivation: {}",
                tab_id, error
            );
            state
                .tabs
                .set_state(tab_id, TabPatch::new().install(InstallStatus::NotInstalled));
            UpdateResult::none()
        }
    }
}

pub fn handle_removal_finished(
    state: &mut AppState,
    tab_id: TabId,
    attempt: u64,
    result: std::result::Result<(), InjectionError>,
) -> UpdateResult {
    let Some(record) = state.tabs.get(tab_id) else {
        debug!("Removal from cleared tab {} finished, ignoring", tab_id);
        return UpdateResult::none();
    };
    if record.install != (InstallStatus::Removing { attempt }) {
        debug!(
            "Stale removal result for tab {} (attempt {}, now {:?})",
            tab_id, attempt, record.install
        );
        return UpdateResult::none();
    }

    let install = match result {
        Ok(()) => {
            info!("Sidebar removed from tab {}", tab_id);
            InstallStatus::NotInstalled
        }
        Err(error) => {
            warn!("Removing sidebar from tab {} failed: {}", tab_id, error);
            InstallStatus::RemovalFailed
        }
    };
    state.tabs.set_state(tab_id, TabPatch::new().install(install));
    UpdateResult::none()
}
