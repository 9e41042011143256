//! tabside - per-tab sidebar activation coordinator
//!
//! The library side of the `tabside` binary: the headless runner that wires
//! the state store, the store watcher and the stdio host bridge into a
//! [`tabside_app::Engine`].

pub mod headless;

pub use headless::{run_headless, HeadlessOptions};
