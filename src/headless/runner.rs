//! Headless runner - main event loop over the host bridge

use tokio::io::BufReader;
use tokio::sync::mpsc;

use tabside_app::{Engine, JsonFileStore};
use tabside_bridge::HostBridge;
use tabside_core::prelude::*;

use super::stdio::{pump_input, pump_output};
use super::HeadlessOptions;

/// Capacity of the outbound line queue
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Run until the host quits or closes stdin
pub async fn run_headless(options: HeadlessOptions) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("tabside starting in HEADLESS mode");
    info!("Store: {}", options.store_path.display());
    info!("═══════════════════════════════════════════════════════");

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
    let bridge = HostBridge::new(outbound_tx, options.settings.bridge.request_timeout());

    let store = JsonFileStore::open(&options.store_path)?;
    let mut engine = Engine::new(options.settings, Box::new(store), bridge.ports());
    info!("Restored {} tab(s)", engine.state.tabs.len());

    if options.watch_store {
        if let Err(e) = engine.watch_store(&options.store_path) {
            warn!("Store watcher unavailable, cross-window resync disabled: {}", e);
        }
    }

    let writer = tokio::spawn(pump_output(
        outbound_rx,
        tokio::io::stdout(),
        engine.shutdown_receiver(),
    ));
    let reader = tokio::spawn(pump_input(
        BufReader::new(tokio::io::stdin()),
        bridge.clone(),
        engine.msg_sender(),
    ));

    engine.run().await;

    // Completions arriving after this point are discarded
    engine.shutdown();
    let cancelled = bridge.cancel_all().await;
    if cancelled > 0 {
        debug!("Cancelled {} pending host request(s)", cancelled);
    }

    reader.abort();
    match writer.await {
        Ok(Err(e)) => warn!("Output pump failed: {}", e),
        Err(e) => warn!("Output pump panicked: {}", e),
        Ok(Ok(())) => {}
    }

    info!("tabside headless mode exiting");
    Ok(())
}

