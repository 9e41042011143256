//! Main update function - handles state transitions (TEA pattern)

use tabside_core::prelude::*;

use crate::message::Message;
use crate::state::AppState;

use super::{browser, reconcile, storage, UpdateResult};

/// Process a message and update state.
///
/// After the message's own transitions are applied, every change the
/// state machine queued is run through the change subscriber before this
/// returns, so the result carries all side effects of the message.
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    let mut result = match message {
        Message::Browser(event) => browser::handle_browser_event(state, event),

        Message::StorageChanged(change) => storage::handle_storage_change(state, change),

        Message::TabLookedUp { tab_id, tab } => reconcile::handle_tab_looked_up(state, tab_id, tab),

        Message::InjectionFinished {
            tab_id,
            attempt,
            result,
        } => reconcile::handle_injection_finished(state, tab_id, attempt, result),

        Message::RemovalFinished {
            tab_id,
            attempt,
            result,
        } => reconcile::handle_removal_finished(state, tab_id, attempt, result),

        Message::AnnotationCountFetched {
            tab_id,
            revision,
            count,
        } => {
            if state.tabs.apply_annotation_count(tab_id, revision, count) {
                debug!("Tab {} has {} annotation(s)", tab_id, count);
            }
            UpdateResult::none()
        }

        Message::Quit => {
            info!("Quit requested");
            state.request_quit();
            UpdateResult::none()
        }
    };

    reconcile::drain_changes(state, &mut result);
    result
}
