//! # tabside-core - Core Domain Types
//!
//! Foundation crate for tabside. Provides the per-tab record types, the
//! inbound browser event definitions, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`TabId`] - Opaque browser tab identifier
//! - [`TabState`] - Whether the sidebar should be present (Active, Inactive, Errored)
//! - [`InstallStatus`] - Whether the sidebar is believed to be injected, including in-flight calls
//! - [`TabRecord`] - The per-tab state record
//! - [`TabPatch`] - Partial record merged by `setState`
//! - [`InjectionError`] - Failure detail reported by an injection attempt
//!
//! ### Events (`events`)
//! - [`BrowserEvent`] - Tab lifecycle events delivered by the browser
//! - [`Tab`], [`TabStatus`] - Live tab snapshot carried by events
//! - [`StorageChange`] - External persistence change notification
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use tabside_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use events::{BrowserEvent, StorageChange, Tab, TabStatus, STATE_STORAGE_KEY};
pub use types::{
    InjectionError, InjectionErrorKind, InstallStatus, PersistedTab, TabId, TabPatch, TabRecord,
    TabState,
};
