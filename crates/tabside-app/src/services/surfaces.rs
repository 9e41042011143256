//! Synchronous browser UI surfaces

use tabside_core::{InjectionError, Tab, TabId, TabRecord, TabState};

/// What the browser-action button should show for a tab
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorBadge {
    pub active: bool,
    pub errored: bool,
    /// Badge text; empty when there is nothing to count
    pub text: String,
}

impl IndicatorBadge {
    pub fn for_record(record: &TabRecord) -> Self {
        let text = if record.annotation_count > 0 && record.state != TabState::Errored {
            record.annotation_count.to_string()
        } else {
            String::new()
        };
        Self {
            active: record.state == TabState::Active,
            errored: record.state == TabState::Errored,
            text,
        }
    }
}

/// Browser-action icon and badge
#[cfg_attr(test, mockall::automock)]
pub trait ActionIndicator: Send + Sync {
    fn update(&self, tab_id: TabId, record: &TabRecord);
}

/// Help view for a failed injection
#[cfg_attr(test, mockall::automock)]
pub trait HelpSurface: Send + Sync {
    fn show_error(&self, tab: &Tab, error: &InjectionError);
}
