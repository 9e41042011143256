//! Configuration file parsing for tabside
//!
//! Supports `<config_dir>/tabside/config.toml` - global settings

pub mod settings;
pub mod types;

pub use settings::{
    default_config_path, default_store_path, init_config_dir, load_settings, resolve_store_path,
};
pub use types::*;
