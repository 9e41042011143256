//! Action handlers: UpdateAction dispatch and background task spawning
//!
//! Indicator and help updates are synchronous and run inline. Every port
//! call is spawned as its own task that reports back with a completion
//! [`Message`]; a task abandoned on shutdown reports nothing.

use std::sync::Arc;

use tabside_core::prelude::*;
use tabside_core::{Tab, TabId};
use tokio::sync::{mpsc, watch};

use crate::handler::UpdateAction;
use crate::message::Message;
use crate::services::{is_countable_url, AnnotationCountPort, InjectionPort, Ports, TabsPort};

/// Perform one action
pub fn handle_action<I, A, T>(
    action: UpdateAction,
    ports: &Ports<I, A, T>,
    msg_tx: mpsc::Sender<Message>,
    shutdown_rx: watch::Receiver<bool>,
) where
    I: InjectionPort + Sync + 'static,
    A: AnnotationCountPort + Sync + 'static,
    T: TabsPort + Sync + 'static,
{
    match action {
        UpdateAction::UpdateIndicator { tab_id, record } => {
            ports.indicator.update(tab_id, &record);
        }

        UpdateAction::ShowHelp { tab, error } => {
            ports.help.show_error(&tab, &error);
        }

        UpdateAction::LookupTab { tab_id } => {
            spawn_tab_lookup(Arc::clone(&ports.tabs), tab_id, msg_tx, shutdown_rx);
        }

        UpdateAction::Inject { tab, attempt } => {
            spawn_injection(Arc::clone(&ports.injection), tab, attempt, msg_tx, shutdown_rx);
        }

        UpdateAction::Remove { tab, attempt } => {
            spawn_removal(Arc::clone(&ports.injection), tab, attempt, msg_tx, shutdown_rx);
        }

        UpdateAction::FetchAnnotationCount {
            tab_id,
            url,
            api_url,
            revision,
        } => {
            spawn_annotation_count(
                Arc::clone(&ports.annotations),
                Arc::clone(&ports.tabs),
                AnnotationCountJob {
                    tab_id,
                    url,
                    api_url,
                    revision,
                },
                msg_tx,
                shutdown_rx,
            );
        }
    }
}

fn spawn_tab_lookup<T>(
    tabs: Arc<T>,
    tab_id: TabId,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    T: TabsPort + Sync + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            tab = tabs.get(tab_id) => {
                let _ = msg_tx.send(Message::TabLookedUp { tab_id, tab }).await;
            }
            _ = shutdown_rx.changed() => {
                debug!("Lookup of tab {} abandoned on shutdown", tab_id);
            }
        }
    });
}

fn spawn_injection<I>(
    injection: Arc<I>,
    tab: Tab,
    attempt: u64,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    I: InjectionPort + Sync + 'static,
{
    tokio::spawn(async move {
        let tab_id = tab.id;
        tokio::select! {
            result = injection.inject(&tab) => {
                let msg = Message::InjectionFinished { tab_id, attempt, result };
                let _ = msg_tx.send(msg).await;
            }
            _ = shutdown_rx.changed() => {
                debug!("Injection into tab {} abandoned on shutdown", tab_id);
            }
        }
    });
}

fn spawn_removal<I>(
    injection: Arc<I>,
    tab: Tab,
    attempt: u64,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    I: InjectionPort + Sync + 'static,
{
    tokio::spawn(async move {
        let tab_id = tab.id;
        tokio::select! {
            result = injection.remove(&tab) => {
                let msg = Message::RemovalFinished { tab_id, attempt, result };
                let _ = msg_tx.send(msg).await;
            }
            _ = shutdown_rx.changed() => {
                debug!("Removal from tab {} abandoned on shutdown", tab_id);
            }
        }
    });
}

struct AnnotationCountJob {
    tab_id: TabId,
    url: Option<String>,
    api_url: String,
    revision: u64,
}

fn spawn_annotation_count<A, T>(
    annotations: Arc<A>,
    tabs: Arc<T>,
    job: AnnotationCountJob,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    A: AnnotationCountPort + Sync + 'static,
    T: TabsPort + Sync + 'static,
{
    tokio::spawn(async move {
        let tab_id = job.tab_id;
        tokio::select! {
            count = fetch_annotation_count(annotations.as_ref(), tabs.as_ref(), &job) => {
                if let Some(count) = count {
                    let msg = Message::AnnotationCountFetched {
                        tab_id,
                        revision: job.revision,
                        count,
                    };
                    let _ = msg_tx.send(msg).await;
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("Annotation count for tab {} abandoned on shutdown", tab_id);
            }
        }
    });
}

/// Failures only cost the badge its count, so they end here
async fn fetch_annotation_count<A, T>(
    annotations: &A,
    tabs: &T,
    job: &AnnotationCountJob,
) -> Option<u64>
where
    A: AnnotationCountPort + Sync,
    T: TabsPort + Sync,
{
    let url = match &job.url {
        Some(url) => url.clone(),
        None => tabs.get(job.tab_id).await?.url?,
    };
    if !is_countable_url(&url) {
        trace!("Not counting annotations for {}", url);
        return None;
    }

    match annotations.fetch_count(&url, &job.api_url).await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Annotation count for tab {} failed: {}", job.tab_id, e);
            None
        }
    }
}
