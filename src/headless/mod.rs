//! Headless mode - the engine driven by a browser host over stdio
//!
//! The host writes newline-delimited JSON to our stdin (browser events,
//! storage changes, responses) and reads port requests and indicator/help
//! notifications from our stdout. Logs go to the log file only.
//!
//! # Example session
//!
//! ```json
//! ← {"type":"event","event":{"kind":"action_clicked","tab":{"id":4,"url":"https://example.com","status":"complete"}}}
//! → {"method":"action.update","params":{"tabId":4,"state":"active",...}}
//! → {"id":1,"method":"tabs.get","params":{"tabId":4}}
//! ← {"type":"response","id":1,"result":{"id":4,"url":"https://example.com","status":"complete"}}
//! → {"id":2,"method":"sidebar.inject","params":{"tab":{...}}}
//! ```

pub mod runner;
pub mod stdio;

use std::path::PathBuf;

use tabside_app::Settings;

pub use runner::run_headless;

/// Everything the headless runner needs, resolved from CLI and config
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub settings: Settings,
    pub store_path: PathBuf,
    /// Feed external rewrites of the store file back in as storage changes
    pub watch_store: bool,
}
