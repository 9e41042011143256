//! stdin/stdout pumps for the host protocol

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

use tabside_app::Message;
use tabside_bridge::{HostBridge, InboundMessage};
use tabside_core::prelude::*;
use tabside_core::StorageChange;

/// Whether the input pump should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Stop,
}

/// Dispatch one inbound line.
///
/// Responses go straight to the bridge; everything else becomes an engine
/// message. A line that does not parse is logged and skipped.
pub async fn route_line(
    line: &str,
    bridge: &HostBridge,
    msg_tx: &mpsc::Sender<Message>,
) -> LineOutcome {
    if line.trim().is_empty() {
        return LineOutcome::Continue;
    }

    let inbound = match InboundMessage::parse(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("{}", e);
            return LineOutcome::Continue;
        }
    };

    let msg = match inbound {
        InboundMessage::Response { id, result, error } => {
            bridge.handle_response(id, result, error).await;
            return LineOutcome::Continue;
        }
        InboundMessage::Event { event } => Message::Browser(event),
        InboundMessage::Storage { key, new_value } => {
            Message::StorageChanged(StorageChange::new(key, new_value))
        }
        InboundMessage::Quit => {
            info!("Host requested quit");
            let _ = msg_tx.send(Message::Quit).await;
            return LineOutcome::Stop;
        }
    };

    if msg_tx.send(msg).await.is_err() {
        warn!("Engine gone, stopping input");
        return LineOutcome::Stop;
    }
    LineOutcome::Continue
}

/// Read host lines until EOF or quit. EOF counts as quit.
pub async fn pump_input<R>(reader: R, bridge: HostBridge, msg_tx: mpsc::Sender<Message>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if route_line(&line, &bridge, &msg_tx).await == LineOutcome::Stop {
                    break;
                }
            }
            Ok(None) => {
                info!("Host closed stdin");
                let _ = msg_tx.send(Message::Quit).await;
                break;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                let _ = msg_tx.send(Message::Quit).await;
                break;
            }
        }
    }

    info!("Input pump exiting");
}

/// Write outbound lines until shutdown, then flush whatever is queued
pub async fn pump_output<W>(
    mut outbound_rx: mpsc::Receiver<String>,
    mut writer: W,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            line = outbound_rx.recv() => match line {
                Some(line) => write_line(&mut writer, &line).await?,
                None => break,
            },
            _ = shutdown_rx.changed() => {
                while let Ok(line) = outbound_rx.try_recv() {
                    write_line(&mut writer, &line).await?;
                }
                break;
            }
        }
    }

    writer.flush().await?;
    Ok(())
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    trace!("→ {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tabside_core::{BrowserEvent, TabId};

    fn bridge() -> (HostBridge, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (HostBridge::new(tx, Duration::from_secs(1)), rx)
    }

    #[tokio::test]
    async fn test_route_event() {
        let (bridge, _out) = bridge();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);

        let outcome = route_line(
            r#"{"type":"event","event":{"kind":"removed","tab_id":5}}"#,
            &bridge,
            &msg_tx,
        )
        .await;

        assert_eq!(outcome, LineOutcome::Continue);
        assert!(matches!(
            msg_rx.recv().await,
            Some(Message::Browser(BrowserEvent::Removed { tab_id: TabId(5) }))
        ));
    }

    #[tokio::test]
    async fn test_route_storage() {
        let (bridge, _out) = bridge();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);

        route_line(
            r#"{"type":"storage","key":"state","new_value":"{}"}"#,
            &bridge,
            &msg_tx,
        )
        .await;

        match msg_rx.recv().await {
            Some(Message::StorageChanged(change)) => assert!(change.is_state_key()),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_and_blank_lines_are_skipped() {
        let (bridge, _out) = bridge();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);

        assert_eq!(
            route_line("{oops", &bridge, &msg_tx).await,
            LineOutcome::Continue
        );
        assert_eq!(route_line("   ", &bridge, &msg_tx).await, LineOutcome::Continue);
        assert!(msg_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_quit_stops_input() {
        let (bridge, _out) = bridge();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);

        let input: &[u8] = b"{\"type\":\"quit\"}\n{\"type\":\"event\",\"event\":{\"kind\":\"removed\",\"tab_id\":1}}\n";
        pump_input(input, bridge, msg_tx).await;

        assert!(matches!(msg_rx.recv().await, Some(Message::Quit)));
        assert!(msg_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_eof_means_quit() {
        let (bridge, _out) = bridge();
        let (msg_tx, mut msg_rx) = mpsc::channel(8);

        let input: &[u8] = b"";
        pump_input(input, bridge, msg_tx).await;

        assert!(matches!(msg_rx.recv().await, Some(Message::Quit)));
    }

    #[tokio::test]
    async fn test_output_is_one_line_per_message() {
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send("{\"a\":1}".to_string()).await.unwrap();
        tx.send("{\"b\":2}".to_string()).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        pump_output(rx, &mut out, shutdown_rx).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn test_output_drains_on_shutdown() {
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send("{\"last\":true}".to_string()).await.unwrap();
        shutdown_tx.send(true).unwrap();

        let mut out = Vec::new();
        pump_output(rx, &mut out, shutdown_rx).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "{\"last\":true}\n");
    }
}
