//! A whole host session over in-memory pipes: the test plays the browser host

use std::time::Duration;

use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

use tabside_app::{Engine, JsonFileStore, Settings, StateStore};
use tabside_bridge::HostBridge;
use tabside_core::{InstallStatus, TabId, TabState};
use tabside_host::headless::stdio::{pump_input, pump_output};

const TAB: i64 = 4;
const URL: &str = "https://example.com/article";

async fn send_line(writer: &mut DuplexStream, value: Value) {
    writer
        .write_all(format!("{}\n", value).as_bytes())
        .await
        .unwrap();
}

/// Complete a page load, click the action, answer requests, then quit.
/// Returns every line the host received.
async fn play_host(mut to_tabside: DuplexStream, from_tabside: DuplexStream) -> Vec<Value> {
    let live = json!({"id": TAB, "url": URL, "status": "complete"});
    let mut received = Vec::new();
    let mut lines = BufReader::new(from_tabside).lines();

    send_line(
        &mut to_tabside,
        json!({"type": "event", "event": {
            "kind": "updated", "tab_id": TAB, "status": "complete", "tab": live
        }}),
    )
    .await;
    send_line(
        &mut to_tabside,
        json!({"type": "event", "event": {"kind": "action_clicked", "tab": live}}),
    )
    .await;

    while let Ok(Some(line)) = lines.next_line().await {
        let value: Value = serde_json::from_str(&line).unwrap();
        received.push(value.clone());

        let Some(id) = value["id"].as_u64() else {
            continue;
        };
        match value["method"].as_str().unwrap() {
            "tabs.get" => {
                send_line(
                    &mut to_tabside,
                    json!({"type": "response", "id": id, "result": live}),
                )
                .await
            }
            "sidebar.inject" => {
                send_line(
                    &mut to_tabside,
                    json!({"type": "response", "id": id, "result": null}),
                )
                .await;
                tokio::time::sleep(Duration::from_millis(200)).await;
                send_line(&mut to_tabside, json!({"type": "quit"})).await;
            }
            other => panic!("unexpected request {}", other),
        }
    }

    received
}

#[tokio::test]
async fn test_host_session_activates_and_persists() {
    let dir = tempdir().unwrap();
    let store_path = dir.path().join("state.json");

    let (outbound_tx, outbound_rx) = mpsc::channel(64);
    let bridge = HostBridge::new(outbound_tx, Duration::from_secs(2));
    let mut engine = Engine::new(
        Settings::default(),
        Box::new(JsonFileStore::open(&store_path).unwrap()),
        bridge.ports(),
    );

    let (host_writer, our_reader) = tokio::io::duplex(4096);
    let (our_writer, host_reader) = tokio::io::duplex(4096);

    let host = tokio::spawn(play_host(host_writer, host_reader));
    let writer = tokio::spawn(pump_output(
        outbound_rx,
        our_writer,
        engine.shutdown_receiver(),
    ));
    tokio::spawn(pump_input(
        BufReader::new(our_reader),
        bridge.clone(),
        engine.msg_sender(),
    ));

    tokio::time::timeout(Duration::from_secs(5), engine.run())
        .await
        .expect("host never quit");

    let record = engine.state.tabs.get_state(TabId(TAB));
    assert_eq!(record.state, TabState::Active);
    assert_eq!(record.install, InstallStatus::Installed);

    engine.shutdown();
    writer.await.unwrap().unwrap();
    drop(engine);
    drop(bridge);

    let received = host.await.unwrap();
    let methods: Vec<&str> = received
        .iter()
        .filter_map(|v| v["method"].as_str())
        .collect();
    assert!(methods.contains(&"action.update"));
    assert_eq!(
        methods.iter().filter(|m| **m == "sidebar.inject").count(),
        1
    );
    assert!(received
        .iter()
        .filter(|v| v["method"] == "action.update")
        .any(|v| v["params"]["active"] == true));

    let reopened = JsonFileStore::open(&store_path).unwrap();
    let persisted = reopened.get(TabId(TAB)).unwrap();
    assert_eq!(persisted.state, TabState::Active);
    assert!(persisted.extension_sidebar_installed);
}
