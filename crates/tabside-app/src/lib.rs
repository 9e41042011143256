//! tabside-app - Tab state machine and reconciliation for tabside
//!
//! This crate implements the TEA (The Elm Architecture) pattern around the
//! per-tab state machine: browser events and port completions become
//! [`Message`]s, `handler::update` applies transitions and runs the change
//! subscriber, and the [`Engine`] performs the resulting actions. It also
//! owns the state store, configuration loading, the collaborator port
//! traits and the store file watcher.

pub mod actions;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod error_cache;
pub mod handler;
pub mod message;
pub mod services;
pub mod state;
pub mod store;
pub mod tab_state;
pub mod watcher;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Re-export primary types
pub use config::Settings;
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use error_cache::{ErrorCache, ErrorRecord};
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use services::Ports;
pub use state::AppState;
pub use store::{JsonFileStore, MemoryStore, SharedMedium, StateStore};
pub use tab_state::{TabChange, TabStateMachine};
