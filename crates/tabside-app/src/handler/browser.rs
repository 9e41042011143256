//! Tab lifecycle and action-click handlers

use tabside_core::prelude::*;
use tabside_core::{BrowserEvent, InstallStatus, Tab, TabId, TabPatch, TabState, TabStatus};

use crate::engine_event::EngineEvent;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

pub fn handle_browser_event(state: &mut AppState, event: BrowserEvent) -> UpdateResult {
    trace!("Browser event for tab {}: {:?}", event.tab_id(), event);
    match event {
        BrowserEvent::Created { tab } => {
            // Ids are reused; drop anything left over from a previous tab
            state.tabs.clear_tab(tab.id);
            UpdateResult::none()
        }

        BrowserEvent::Updated {
            tab_id,
            status,
            tab,
        } => match status {
            Some(TabStatus::Loading) => handle_navigation_started(state, tab_id, tab.url),
            Some(TabStatus::Complete) => {
                state.tabs.set_state(tab_id, TabPatch::new().ready(true));
                UpdateResult::none()
            }
            None => UpdateResult::none(),
        },

        BrowserEvent::Replaced { added, removed } => handle_tab_replaced(state, added, removed),

        BrowserEvent::Removed { tab_id } => {
            state.tabs.clear_tab(tab_id);
            UpdateResult::none()
        }

        BrowserEvent::ActionClicked { tab } => handle_action_clicked(state, tab),
    }
}

/// Reset the record for a new navigation and refresh its annotation count
fn handle_navigation_started(
    state: &mut AppState,
    tab_id: TabId,
    url: Option<String>,
) -> UpdateResult {
    let mut patch = TabPatch::new()
        .ready(false)
        .annotation_count(0)
        .install(InstallStatus::NotInstalled);
    if state.tabs.is_tab_errored(tab_id) {
        debug!("Tab {} navigated while errored, retrying activation", tab_id);
        patch = patch.state(TabState::Active);
    }
    state.tabs.reset_tab(tab_id, patch);

    annotation_refresh(state, tab_id, url)
}

/// Move the record from `removed` to `added`
fn handle_tab_replaced(state: &mut AppState, added: TabId, removed: TabId) -> UpdateResult {
    let carried = state.tabs.get_state(removed).state;
    debug!(
        "Tab {} replaced by {}, carrying state {}",
        removed, added, carried
    );

    if carried == TabState::Errored {
        if let Some(error) = state.errors.get_tab_error(removed).cloned() {
            state.errors.set_tab_error(added, error);
        }
    }

    state.tabs.reset_tab(
        added,
        TabPatch::new()
            .state(carried)
            .ready(true)
            .annotation_count(0)
            .install(InstallStatus::NotInstalled),
    );
    state.tabs.clear_tab(removed);

    annotation_refresh(state, added, None)
}

fn handle_action_clicked(state: &mut AppState, tab: Tab) -> UpdateResult {
    if state.tabs.is_tab_errored(tab.id) {
        if let Some(error) = state.errors.get_tab_error(tab.id).cloned() {
            info!("Showing help for tab {}: {}", tab.id, error);
            let tab_id = tab.id;
            let mut result = UpdateResult::action(UpdateAction::ShowHelp {
                tab,
                error: error.clone(),
            });
            result.push_event(EngineEvent::HelpShown { tab_id, error });
            return result;
        }
    }

    let next = state.tabs.get_state(tab.id).state.toggled();
    debug!("Tab {} toggled to {}", tab.id, next);
    state.tabs.set_state(tab.id, TabPatch::new().state(next));
    UpdateResult::none()
}

fn annotation_refresh(state: &AppState, tab_id: TabId, url: Option<String>) -> UpdateResult {
    if !state.settings.annotations.enabled {
        return UpdateResult::none();
    }
    let request = state.tabs.annotation_count_request(tab_id, url);
    UpdateResult::action(UpdateAction::FetchAnnotationCount {
        tab_id: request.tab_id,
        url: request.url,
        api_url: state.settings.annotations.api_url.clone(),
        revision: request.revision,
    })
}
