//! tabside - per-tab sidebar activation coordinator
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use tabside_app::config::{
    default_config_path, init_config_dir, load_settings, resolve_store_path, Settings,
};
use tabside_core::logging;
use tabside_core::prelude::*;
use tabside_host::HeadlessOptions;

/// tabside - keeps a sidebar overlay in sync with per-tab activation state
#[derive(Parser, Debug)]
#[command(name = "tabside")]
#[command(about = "Per-tab sidebar activation coordinator", long_about = None)]
struct Args {
    /// Config file (default: <config dir>/tabside/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// State store file, overriding `store.path`
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Do not watch the store file for changes made by other windows
    #[arg(long)]
    no_watch: bool,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install().map_err(|e| Error::startup(e.to_string()))?;
    logging::init()?;

    let config_path = args.config.or_else(default_config_path);

    if args.init_config {
        let path = config_path
            .ok_or_else(|| Error::config("No config directory on this platform"))?;
        init_config_dir(&path)?;
        eprintln!("Config written to {}", path.display());
        return Ok(());
    }

    let settings = match config_path.as_deref() {
        Some(path) => load_settings(path),
        None => Settings::default(),
    };
    let store_path = resolve_store_path(&settings, args.store.as_deref());
    let watch_store = settings.store.watch && !args.no_watch;

    let result = tabside_host::run_headless(HeadlessOptions {
        settings,
        store_path,
        watch_store,
    })
    .await;

    if let Err(ref e) = result {
        error!("Application error: {:?}", e);
    }
    result
}
