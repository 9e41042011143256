//! Configuration types for tabside
//!
//! Defines:
//! - `Settings` - Global application settings
//! - `AnnotationSettings`, `StoreSettings`, `BridgeSettings` - its sections

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default annotation service endpoint
pub const DEFAULT_API_URL: &str = "https://hypothes.is/api";

/// Default store file debounce window
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Default host request timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Application settings (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub annotations: AnnotationSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// Annotation count lookups
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnnotationSettings {
    /// Base URL of the annotation API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Whether to fetch counts at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            enabled: true,
        }
    }
}

/// Persisted tab state file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Store file location; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Resync when another process rewrites the store file
    #[serde(default = "default_true")]
    pub watch: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            watch: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl StoreSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Host bridge requests
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BridgeSettings {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl BridgeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
