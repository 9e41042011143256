//! Core domain type definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque browser tab identifier.
///
/// Unique among open tabs at any instant, but the browser may reuse an id
/// after the tab closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Whether the sidebar should be present in a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// Sidebar requested
    Active,
    /// Sidebar not requested
    #[default]
    Inactive,
    /// The last injection attempt failed
    Errored,
}

impl TabState {
    /// State after the user clicks the browser action.
    ///
    /// An errored tab that reaches this point has no error to show, so it
    /// gets another chance at activation.
    pub fn toggled(self) -> Self {
        match self {
            TabState::Active => TabState::Inactive,
            TabState::Inactive | TabState::Errored => TabState::Active,
        }
    }
}

impl fmt::Display for TabState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabState::Active => write!(f, "active"),
            TabState::Inactive => write!(f, "inactive"),
            TabState::Errored => write!(f, "errored"),
        }
    }
}

/// Whether the sidebar is believed to be injected into a tab.
///
/// `Installing` and `Removing` mark an in-flight injection port call. The
/// attempt id lets the completion tell whether the record still describes
/// the call it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallStatus {
    #[default]
    NotInstalled,
    Installing {
        attempt: u64,
    },
    Installed,
    Removing {
        attempt: u64,
    },
    /// Removal was attempted and failed; the sidebar is still present
    RemovalFailed,
}

impl InstallStatus {
    /// Boolean view used for persistence and the browser-facing record.
    ///
    /// Only `NotInstalled` counts as absent: an injection in flight has
    /// already claimed the tab, and a removal in flight (or a failed one)
    /// has not yet released it.
    pub fn is_installed(&self) -> bool {
        !matches!(self, InstallStatus::NotInstalled)
    }

    /// Attempt id of the in-flight port call, if any
    pub fn in_flight_attempt(&self) -> Option<u64> {
        match self {
            InstallStatus::Installing { attempt } | InstallStatus::Removing { attempt } => {
                Some(*attempt)
            }
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight_attempt().is_some()
    }
}

/// State record for one tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: TabId,
    pub state: TabState,
    /// Navigation has completed
    pub ready: bool,
    pub annotation_count: u64,
    pub install: InstallStatus,
    /// Sequence number of the last lifecycle reset (navigation or replacement)
    pub revision: u64,
}

impl TabRecord {
    /// The default record for an untracked tab
    pub fn new(id: TabId) -> Self {
        Self {
            id,
            state: TabState::Inactive,
            ready: false,
            annotation_count: 0,
            install: InstallStatus::NotInstalled,
            revision: 0,
        }
    }

    pub fn extension_sidebar_installed(&self) -> bool {
        self.install.is_installed()
    }

    /// Merge the fields present in `patch` into this record
    pub fn apply(&mut self, patch: &TabPatch) {
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(ready) = patch.ready {
            self.ready = ready;
        }
        if let Some(count) = patch.annotation_count {
            self.annotation_count = count;
        }
        if let Some(install) = patch.install {
            self.install = install;
        }
        if let Some(revision) = patch.revision {
            self.revision = revision;
        }
    }

    /// The persisted subset of this record
    pub fn to_persisted(&self) -> PersistedTab {
        PersistedTab {
            state: self.state,
            ready: self.ready,
            annotation_count: self.annotation_count,
            extension_sidebar_installed: self.extension_sidebar_installed(),
        }
    }

    /// Rebuild a record from its persisted subset.
    ///
    /// In-flight statuses are not persisted, so a stored `true` is read back
    /// as a settled `Installed`.
    pub fn from_persisted(id: TabId, persisted: &PersistedTab) -> Self {
        Self {
            id,
            state: persisted.state,
            ready: persisted.ready,
            annotation_count: persisted.annotation_count,
            install: if persisted.extension_sidebar_installed {
                InstallStatus::Installed
            } else {
                InstallStatus::NotInstalled
            },
            revision: 0,
        }
    }
}

/// Partial record passed to `setState`; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabPatch {
    pub state: Option<TabState>,
    pub ready: Option<bool>,
    pub annotation_count: Option<u64>,
    pub install: Option<InstallStatus>,
    pub revision: Option<u64>,
}

impl TabPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: TabState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = Some(ready);
        self
    }

    pub fn annotation_count(mut self, count: u64) -> Self {
        self.annotation_count = Some(count);
        self
    }

    pub fn install(mut self, install: InstallStatus) -> Self {
        self.install = Some(install);
        self
    }

    pub fn revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted subset of a [`TabRecord`], keyed by tab id in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTab {
    pub state: TabState,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub annotation_count: u64,
    #[serde(default)]
    pub extension_sidebar_installed: bool,
}

/// Category of an injection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionErrorKind {
    /// The page already carries a sidebar from another source
    AlreadyInjected,
    /// The browser forbids scripting this URL
    RestrictedUrl,
    /// A local file page without file access permission
    NoFileAccess,
    Unknown,
}

impl fmt::Display for InjectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionErrorKind::AlreadyInjected => write!(f, "already-injected"),
            InjectionErrorKind::RestrictedUrl => write!(f, "restricted-url"),
            InjectionErrorKind::NoFileAccess => write!(f, "no-file-access"),
            InjectionErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Failure reported by the injection port
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct InjectionError {
    #[serde(rename = "type")]
    pub kind: InjectionErrorKind,
    #[serde(default)]
    pub message: String,
}

impl InjectionError {
    pub fn new(kind: InjectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn already_injected(message: impl Into<String>) -> Self {
        Self::new(InjectionErrorKind::AlreadyInjected, message)
    }

    pub fn restricted_url(message: impl Into<String>) -> Self {
        Self::new(InjectionErrorKind::RestrictedUrl, message)
    }

    pub fn no_file_access(message: impl Into<String>) -> Self {
        Self::new(InjectionErrorKind::NoFileAccess, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(InjectionErrorKind::Unknown, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = TabRecord::new(TabId(3));
        assert_eq!(record.id, TabId(3));
        assert_eq!(record.state, TabState::Inactive);
        assert!(!record.ready);
        assert_eq!(record.annotation_count, 0);
        assert!(!record.extension_sidebar_installed());
    }

    #[test]
    fn test_toggle() {
        assert_eq!(TabState::Active.toggled(), TabState::Inactive);
        assert_eq!(TabState::Inactive.toggled(), TabState::Active);
        assert_eq!(TabState::Errored.toggled(), TabState::Active);
    }

    #[test]
    fn test_install_status_boolean_view() {
        assert!(!InstallStatus::NotInstalled.is_installed());
        assert!(InstallStatus::Installing { attempt: 1 }.is_installed());
        assert!(InstallStatus::Installed.is_installed());
        assert!(InstallStatus::Removing { attempt: 2 }.is_installed());
        assert!(InstallStatus::RemovalFailed.is_installed());
    }

    #[test]
    fn test_in_flight_attempt() {
        assert_eq!(
            InstallStatus::Installing { attempt: 7 }.in_flight_attempt(),
            Some(7)
        );
        assert_eq!(
            InstallStatus::Removing { attempt: 8 }.in_flight_attempt(),
            Some(8)
        );
        assert!(!InstallStatus::Installed.is_in_flight());
    }

    #[test]
    fn test_apply_only_touches_given_fields() {
        let mut record = TabRecord::new(TabId(1));
        record.apply(&TabPatch::new().state(TabState::Active));
        record.apply(&TabPatch::new().annotation_count(4));
        record.apply(&TabPatch::new().ready(true));

        assert_eq!(record.state, TabState::Active);
        assert_eq!(record.annotation_count, 4);
        assert!(record.ready);
        assert_eq!(record.install, InstallStatus::NotInstalled);
    }

    #[test]
    fn test_empty_patch() {
        assert!(TabPatch::new().is_empty());
        assert!(!TabPatch::new().ready(false).is_empty());
    }

    #[test]
    fn test_persisted_subset_collapses_in_flight_status() {
        let mut record = TabRecord::new(TabId(9));
        record.apply(
            &TabPatch::new()
                .state(TabState::Active)
                .install(InstallStatus::Installing { attempt: 4 }),
        );

        let persisted = record.to_persisted();
        assert!(persisted.extension_sidebar_installed);

        let restored = TabRecord::from_persisted(TabId(9), &persisted);
        assert_eq!(restored.install, InstallStatus::Installed);
        assert_eq!(restored.state, TabState::Active);
    }

    #[test]
    fn test_persisted_json_layout() {
        let persisted = PersistedTab {
            state: TabState::Active,
            ready: true,
            annotation_count: 2,
            extension_sidebar_installed: false,
        };
        let json = serde_json::to_value(persisted).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["annotationCount"], 2);
        assert_eq!(json["extensionSidebarInstalled"], false);
    }

    #[test]
    fn test_injection_error_wire_format() {
        let err: InjectionError =
            serde_json::from_str(r#"{"type":"restricted-url","message":"chrome://"}"#).unwrap();
        assert_eq!(err.kind, InjectionErrorKind::RestrictedUrl);
        assert_eq!(err.to_string(), "restricted-url: chrome://");
    }

    #[test]
    fn test_injection_error_message_defaults_to_empty() {
        let err: InjectionError = serde_json::from_str(r#"{"type":"unknown"}"#).unwrap();
        assert_eq!(err, InjectionError::unknown(""));
    }
}
