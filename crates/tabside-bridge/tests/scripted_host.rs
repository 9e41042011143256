//! The engine driven through a HostBridge against a scripted host task

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use tabside_app::{Engine, MemoryStore, Settings};
use tabside_bridge::{HostBridge, InboundMessage};
use tabside_core::{BrowserEvent, InstallStatus, Tab, TabId, TabState, TabStatus};

type HostEngine = Engine<HostBridge, HostBridge, HostBridge>;

/// Notifications the scripted host received, in order
#[derive(Clone, Default)]
struct Received(Arc<Mutex<Vec<Value>>>);

impl Received {
    fn methods(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .map(|v| v["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn last(&self, method: &str) -> Option<Value> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|v| v["method"] == method)
            .cloned()
    }
}

fn url_for(tab_id: i64) -> &'static str {
    match tab_id {
        42 => "chrome://newtab",
        _ => "https://example.com/page",
    }
}

/// Answer requests like a browser would and record everything else
fn spawn_host(bridge: HostBridge, mut outbound_rx: mpsc::Receiver<String>) -> Received {
    let received = Received::default();
    let log = received.clone();

    tokio::spawn(async move {
        while let Some(line) = outbound_rx.recv().await {
            let value: Value = serde_json::from_str(&line).unwrap();
            let Some(id) = value["id"].as_u64() else {
                log.0.lock().unwrap().push(value);
                continue;
            };

            let (result, error) = match value["method"].as_str().unwrap() {
                "tabs.get" => {
                    let tab_id = value["params"]["tabId"].as_i64().unwrap();
                    (
                        Some(json!({"id": tab_id, "url": url_for(tab_id), "status": "complete"})),
                        None,
                    )
                }
                "sidebar.inject" => {
                    let url = value["params"]["tab"]["url"].as_str().unwrap_or_default();
                    if url.starts_with("chrome://") {
                        (
                            None,
                            Some(json!({"type": "restricted-url", "message": url})),
                        )
                    } else {
                        (Some(Value::Null), None)
                    }
                }
                "sidebar.remove" => (Some(Value::Null), None),
                "annotations.count" => (Some(json!({"total": 5})), None),
                other => panic!("unexpected method {}", other),
            };
            bridge.handle_response(id, result, error).await;
        }
    });

    received
}

fn setup() -> (HostEngine, Received) {
    let (outbound_tx, outbound_rx) = mpsc::channel(64);
    let bridge = HostBridge::new(outbound_tx, Duration::from_secs(2));
    let engine = Engine::new(
        Settings::default(),
        Box::new(MemoryStore::new()),
        bridge.ports(),
    );
    let received = spawn_host(bridge, outbound_rx);
    (engine, received)
}

async fn feed(engine: &mut HostEngine, line: &str) {
    match InboundMessage::parse(line).unwrap() {
        InboundMessage::Event { event } => engine.process_message(event.into()),
        other => panic!("unexpected line {:?}", other),
    }
    while let Ok(Some(msg)) =
        tokio::time::timeout(Duration::from_millis(200), engine.msg_rx.recv()).await
    {
        engine.process_message(msg);
    }
}

fn live(tab_id: i64) -> Tab {
    Tab::new(TabId(tab_id))
        .with_url(url_for(tab_id))
        .with_status(TabStatus::Complete)
}

async fn open_and_click(engine: &mut HostEngine, tab_id: i64) {
    let completed = BrowserEvent::Updated {
        tab_id: TabId(tab_id),
        status: Some(TabStatus::Complete),
        tab: live(tab_id),
    };
    feed(
        engine,
        &json!({"type": "event", "event": completed}).to_string(),
    )
    .await;

    let clicked = BrowserEvent::ActionClicked { tab: live(tab_id) };
    feed(engine, &json!({"type": "event", "event": clicked}).to_string()).await;
}

#[tokio::test]
async fn test_click_installs_through_host() {
    let (mut engine, received) = setup();

    open_and_click(&mut engine, 1).await;

    let record = engine.state.tabs.get_state(TabId(1));
    assert_eq!(record.state, TabState::Active);
    assert_eq!(record.install, InstallStatus::Installed);

    let update = received.last("action.update").unwrap();
    assert_eq!(update["params"]["tabId"], 1);
    assert_eq!(update["params"]["active"], true);
    assert!(!received.methods().contains(&"help.show".to_string()));

    engine.shutdown();
}

#[tokio::test]
async fn test_restricted_page_reports_help() {
    let (mut engine, received) = setup();

    open_and_click(&mut engine, 42).await;
    assert!(engine.state.tabs.is_tab_errored(TabId(42)));

    let update = received.last("action.update").unwrap();
    assert_eq!(update["params"]["errored"], true);

    let clicked = BrowserEvent::ActionClicked { tab: live(42) };
    feed(
        &mut engine,
        &json!({"type": "event", "event": clicked}).to_string(),
    )
    .await;

    let help = received.last("help.show").unwrap();
    assert_eq!(help["params"]["tabId"], 42);
    assert_eq!(help["params"]["error"]["type"], "restricted-url");

    engine.shutdown();
}
