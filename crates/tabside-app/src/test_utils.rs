//! Recording fakes for the collaborator ports
//!
//! Available to unit tests and, through the `test-helpers` feature, to
//! integration tests and downstream crates.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tabside_core::prelude::*;
use tabside_core::{InjectionError, Tab, TabId, TabRecord};

use crate::services::{
    ActionIndicator, AnnotationCountPort, HelpSurface, InjectionPort, Ports, TabsPort,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Injection port that succeeds unless told otherwise
#[derive(Debug, Default)]
pub struct FakeInjection {
    inject_results: Mutex<VecDeque<std::result::Result<(), InjectionError>>>,
    remove_results: Mutex<VecDeque<std::result::Result<(), InjectionError>>>,
    inject_calls: Mutex<Vec<TabId>>,
    remove_calls: Mutex<Vec<TabId>>,
}

impl FakeInjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next `inject` call
    pub fn push_inject_result(&self, result: std::result::Result<(), InjectionError>) {
        lock(&self.inject_results).push_back(result);
    }

    /// Queue the outcome of the next `remove` call
    pub fn push_remove_result(&self, result: std::result::Result<(), InjectionError>) {
        lock(&self.remove_results).push_back(result);
    }

    pub fn inject_calls(&self) -> Vec<TabId> {
        lock(&self.inject_calls).clone()
    }

    pub fn remove_calls(&self) -> Vec<TabId> {
        lock(&self.remove_calls).clone()
    }
}

impl InjectionPort for FakeInjection {
    async fn inject(&self, tab: &Tab) -> std::result::Result<(), InjectionError> {
        lock(&self.inject_calls).push(tab.id);
        lock(&self.inject_results).pop_front().unwrap_or(Ok(()))
    }

    async fn remove(&self, tab: &Tab) -> std::result::Result<(), InjectionError> {
        lock(&self.remove_calls).push(tab.id);
        lock(&self.remove_results).pop_front().unwrap_or(Ok(()))
    }
}

/// Annotation port answering from a fixed table; unknown URLs count zero
#[derive(Debug, Default)]
pub struct FakeAnnotations {
    counts: Mutex<HashMap<String, u64>>,
    fail: Mutex<bool>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&self, url: impl Into<String>, count: u64) {
        lock(&self.counts).insert(url.into(), count);
    }

    /// Make every subsequent fetch fail
    pub fn fail_all(&self) {
        *lock(&self.fail) = true;
    }

    /// `(url, api_url)` of every fetch so far
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }
}

impl AnnotationCountPort for FakeAnnotations {
    async fn fetch_count(&self, url: &str, api_url: &str) -> Result<u64> {
        lock(&self.calls).push((url.to_string(), api_url.to_string()));
        if *lock(&self.fail) {
            return Err(Error::annotation_count(format!("no count for {}", url)));
        }
        Ok(lock(&self.counts).get(url).copied().unwrap_or(0))
    }
}

/// Tabs port over an editable table of live tabs
#[derive(Debug, Default)]
pub struct FakeTabs {
    tabs: Mutex<HashMap<TabId, Tab>>,
}

impl FakeTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tab: Tab) {
        lock(&self.tabs).insert(tab.id, tab);
    }

    pub fn remove(&self, tab_id: TabId) {
        lock(&self.tabs).remove(&tab_id);
    }
}

impl TabsPort for FakeTabs {
    async fn get(&self, tab_id: TabId) -> Option<Tab> {
        lock(&self.tabs).get(&tab_id).cloned()
    }
}

/// Indicator that records every update
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    updates: Mutex<Vec<(TabId, TabRecord)>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(TabId, TabRecord)> {
        lock(&self.updates).clone()
    }

    /// Most recent record shown for `tab_id`
    pub fn last_for(&self, tab_id: TabId) -> Option<TabRecord> {
        lock(&self.updates)
            .iter()
            .rev()
            .find(|(id, _)| *id == tab_id)
            .map(|(_, record)| record.clone())
    }
}

impl ActionIndicator for RecordingIndicator {
    fn update(&self, tab_id: TabId, record: &TabRecord) {
        lock(&self.updates).push((tab_id, record.clone()));
    }
}

/// Help surface that records every error shown
#[derive(Debug, Default)]
pub struct RecordingHelp {
    shown: Mutex<Vec<(TabId, InjectionError)>>,
}

impl RecordingHelp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<(TabId, InjectionError)> {
        lock(&self.shown).clone()
    }
}

impl HelpSurface for RecordingHelp {
    fn show_error(&self, tab: &Tab, error: &InjectionError) {
        lock(&self.shown).push((tab.id, error.clone()));
    }
}

/// Fake ports plus handles to inspect them
pub struct FakePorts {
    pub injection: Arc<FakeInjection>,
    pub annotations: Arc<FakeAnnotations>,
    pub tabs: Arc<FakeTabs>,
    pub indicator: Arc<RecordingIndicator>,
    pub help: Arc<RecordingHelp>,
}

impl FakePorts {
    pub fn new() -> Self {
        Self {
            injection: Arc::new(FakeInjection::new()),
            annotations: Arc::new(FakeAnnotations::new()),
            tabs: Arc::new(FakeTabs::new()),
            indicator: Arc::new(RecordingIndicator::new()),
            help: Arc::new(RecordingHelp::new()),
        }
    }

    pub fn ports(&self) -> Ports<FakeInjection, FakeAnnotations, FakeTabs> {
        Ports::new(
            Arc::clone(&self.injection),
            Arc::clone(&self.annotations),
            Arc::clone(&self.tabs),
            self.indicator.clone(),
            self.help.clone(),
        )
    }
}

impl Default for FakePorts {
    fn default() -> Self {
        Self::new()
    }
}
