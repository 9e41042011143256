//! Store file watcher
//!
//! Watches the directory holding the state store file and turns every
//! debounced change to that file into a storage-change message carrying the
//! file's new contents. Our own writes come back through here too; the
//! handler recognizes them by comparing against the current snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tabside_core::prelude::*;
use tabside_core::{StorageChange, STATE_STORAGE_KEY};
use tokio::sync::{mpsc, oneshot};

use crate::message::Message;
use crate::store::read_locked;

/// How often the blocking loop checks for a stop request
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Feeds external changes of the store file into the engine
pub struct StoreWatcher {
    store_path: PathBuf,
    debounce: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl StoreWatcher {
    pub fn new(store_path: PathBuf, debounce: Duration) -> Self {
        Self {
            store_path,
            debounce,
            stop_tx: None,
        }
    }

    /// Start watching; sends `Message::StorageChanged` to `message_tx`
    pub fn start(&mut self, message_tx: mpsc::Sender<Message>) -> Result<()> {
        if self.is_running() {
            return Err(Error::store("Store watcher is already running"));
        }
        let (dir, file_name) = split_store_path(&self.store_path)?;

        let debounce = self.debounce;
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::task::spawn_blocking(move || {
            Self::run_watcher(dir, file_name, debounce, message_tx, stop_rx);
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    fn run_watcher(
        dir: PathBuf,
        file_name: std::ffi::OsString,
        debounce: Duration,
        message_tx: mpsc::Sender<Message>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let store_path = dir.join(&file_name);
        let watched_path = store_path.clone();

        let debouncer_result = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        event
                            .paths
                            .iter()
                            .any(|path| path.file_name() == Some(file_name.as_os_str()))
                    });
                    if !touched {
                        return;
                    }

                    let new_value = read_store_value(&watched_path);
                    debug!(
                        "Store file changed ({} bytes)",
                        new_value.as_ref().map_or(0, String::len)
                    );
                    let change = StorageChange::new(STATE_STORAGE_KEY, new_value);
                    let _ = message_tx.blocking_send(Message::StorageChanged(change));
                }
                Err(errors) => {
                    for error in errors {
                        warn!("Store watcher error: {:?}", error);
                    }
                }
            }
        });

        let mut debouncer = match debouncer_result {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to create store watcher: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer.watch(&dir, RecursiveMode::NonRecursive) {
            error!("Failed to watch {}: {}", dir.display(), e);
            return;
        }
        info!("Watching store file {}", store_path.display());

        loop {
            match stop_rx.try_recv() {
                Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                    info!("Store watcher stopping");
                    break;
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    std::thread::sleep(STOP_POLL_INTERVAL);
                }
            }
        }
    }
}

impl Drop for StoreWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn split_store_path(path: &Path) -> Result<(PathBuf, std::ffi::OsString)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::store(format!("Store path {:?} has no file name", path)))?
        .to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

/// Current file contents; a deleted or unreadable file reads as no value
fn read_store_value(path: &Path) -> Option<String> {
    match read_locked(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read store file {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_split_store_path() {
        let (dir, name) = split_store_path(Path::new("/data/tabside/state.json")).unwrap();
        assert_eq!(dir, PathBuf::from("/data/tabside"));
        assert_eq!(name, "state.json");

        let (dir, _) = split_store_path(Path::new("state.json")).unwrap();
        assert_eq!(dir, PathBuf::from("."));

        assert!(split_store_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_read_store_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        assert_eq!(read_store_value(&path), None);

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(read_store_value(&path), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let mut watcher = StoreWatcher::new(PathBuf::from("/tmp/state.json"), Duration::ZERO);
        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_double_start_error() {
        let dir = tempdir().unwrap();
        let mut watcher = StoreWatcher::new(dir.path().join("state.json"), Duration::from_millis(50));
        let (tx, _rx) = mpsc::channel(8);

        assert!(watcher.start(tx.clone()).is_ok());
        assert!(watcher.is_running());
        assert!(watcher.start(tx).is_err());

        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_external_write_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut watcher = StoreWatcher::new(path.clone(), Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(8);
        watcher.start(tx).unwrap();

        // Give the blocking task time to register the watch
        tokio::time::sleep(Duration::from_millis(300)).await;
        std::fs::write(&path, r#"{"1":{"state":"active"}}"#).unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no storage change within 5s")
            .expect("channel closed");
        match msg {
            Message::StorageChanged(change) => {
                assert!(change.is_state_key());
                assert_eq!(
                    change.new_value.as_deref(),
                    Some(r#"{"1":{"state":"active"}}"#)
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }

        watcher.stop();
    }
}
