//! Engine - owns the reconciler state and every channel around it
//!
//! The Engine serializes all state transitions: browser events, storage
//! changes and port completions all arrive as [`Message`]s on one channel
//! and are processed one at a time. Port calls run as spawned tasks that
//! report back on the same channel.

use std::path::Path;

use tabside_core::prelude::*;
use tokio::sync::{broadcast, mpsc, watch};

use crate::actions::handle_action;
use crate::config::Settings;
use crate::engine_event::EngineEvent;
use crate::handler::{self, UpdateResult};
use crate::message::Message;
use crate::services::{AnnotationCountPort, InjectionPort, Ports, TabsPort};
use crate::state::AppState;
use crate::store::StateStore;
use crate::watcher::StoreWatcher;

/// Capacity of the message channel
pub const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the engine event broadcast
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct Engine<I, A, T> {
    pub state: AppState,
    ports: Ports<I, A, T>,
    msg_tx: mpsc::Sender<Message>,
    pub msg_rx: mpsc::Receiver<Message>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    event_tx: broadcast::Sender<EngineEvent>,
    watcher: Option<StoreWatcher>,
}

impl<I, A, T> Engine<I, A, T>
where
    I: InjectionPort + Sync + 'static,
    A: AnnotationCountPort + Sync + 'static,
    T: TabsPort + Sync + 'static,
{
    /// Build an engine over `store`, restoring every persisted tab
    pub fn new(settings: Settings, store: Box<dyn StateStore>, ports: Ports<I, A, T>) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: AppState::new(settings, store),
            ports,
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            event_tx,
            watcher: None,
        }
    }

    /// Sender for feeding messages into the engine
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Receiver of engine events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Receiver that flips to `true` on shutdown
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Start feeding storage changes from the store file at `path`
    pub fn watch_store(&mut self, path: &Path) -> Result<()> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let mut watcher = StoreWatcher::new(path.to_path_buf(), self.state.settings.store.debounce());
        watcher.start(self.msg_sender())?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Run one message through the update function and perform its effects
    pub fn process_message(&mut self, msg: Message) {
        let UpdateResult { actions, events } = handler::update(&mut self.state, msg);

        for event in events {
            trace!("Engine event: {}", event.event_type());
            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }

        for action in actions {
            handle_action(
                action,
                &self.ports,
                self.msg_tx.clone(),
                self.shutdown_rx.clone(),
            );
        }
    }

    /// Process messages until quit or every sender is gone
    pub async fn run(&mut self) {
        info!("Engine running");
        while !self.should_quit() {
            match self.msg_rx.recv().await {
                Some(msg) => self.process_message(msg),
                None => {
                    info!("Message channel closed");
                    break;
                }
            }
        }
    }

    /// Process whatever is already queued without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
            processed += 1;
        }
        processed
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Stop the watcher and abandon in-flight port calls
    pub fn shutdown(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        let _ = self.shutdown_tx.send(true);
        info!("Engine shut down");
    }
}
