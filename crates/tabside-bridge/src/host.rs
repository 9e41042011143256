//! HostBridge - every collaborator port, answered by the browser host
//!
//! Outbound lines are queued on an mpsc channel drained by the process's
//! stdout writer. Requests wait on the [`RequestTracker`] until the stdin
//! reader routes the matching response back through [`HostBridge::handle_response`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use tabside_app::services::{
    ActionIndicator, AnnotationCountPort, HelpSurface, InjectionPort, Ports, TabsPort,
};
use tabside_core::prelude::*;
use tabside_core::{InjectionError, Tab, TabId, TabRecord};

use crate::protocol::{
    parse_annotation_count, parse_injection_error, HostNotification, HostRequest,
};
use crate::tracker::{HostResponse, RequestTracker};

/// Ports bundle where the host answers every call
pub type HostPorts = Ports<HostBridge, HostBridge, HostBridge>;

#[derive(Clone)]
pub struct HostBridge {
    outbound_tx: mpsc::Sender<String>,
    tracker: Arc<RequestTracker>,
    timeout: Duration,
}

impl HostBridge {
    pub fn new(outbound_tx: mpsc::Sender<String>, timeout: Duration) -> Self {
        Self {
            outbound_tx,
            tracker: Arc::new(RequestTracker::new()),
            timeout,
        }
    }

    /// Send a request and wait for the host's answer
    pub async fn request(&self, request: HostRequest) -> Result<HostResponse> {
        let method = request.method();
        let (id, rx) = self.tracker.register(method).await;

        debug!("Host request #{}: {}", id, method);
        if self.outbound_tx.send(request.build(id)).await.is_err() {
            self.tracker.forget(id).await;
            return Err(Error::channel_send("host output closed"));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::bridge(format!("{} request #{} dropped", method, id))),
            Err(_) => {
                self.tracker.forget(id).await;
                Err(Error::bridge_timeout(method, self.timeout.as_millis() as u64))
            }
        }
    }

    /// Queue a notification; dropped with a warning if the output is full
    pub fn notify(&self, notification: HostNotification) {
        if let Err(e) = self.outbound_tx.try_send(notification.build()) {
            warn!("Dropping {} notification: {}", notification.method(), e);
        }
    }

    /// Route a response line. Returns false for unknown ids
    pub async fn handle_response(
        &self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> bool {
        let matched = self.tracker.handle_response(id, result, error).await;
        if !matched {
            warn!("Response #{} matches no pending request", id);
        }
        matched
    }

    /// Fail every request still waiting on the host
    pub async fn cancel_all(&self) -> usize {
        self.tracker.cancel_all().await
    }

    pub async fn pending_count(&self) -> usize {
        self.tracker.pending_count().await
    }

    /// All five ports backed by this bridge
    pub fn ports(&self) -> HostPorts {
        let bridge = Arc::new(self.clone());
        Ports::new(
            Arc::clone(&bridge),
            Arc::clone(&bridge),
            Arc::clone(&bridge),
            Arc::clone(&bridge) as Arc<dyn ActionIndicator>,
            bridge as Arc<dyn HelpSurface>,
        )
    }

    async fn sidebar_call(&self, request: HostRequest) -> std::result::Result<(), InjectionError> {
        match self.request(request).await {
            Ok(HostResponse {
                error: Some(error), ..
            }) => Err(parse_injection_error(&error)),
            Ok(_) => Ok(()),
            Err(e) => Err(InjectionError::unknown(e.to_string())),
        }
    }
}

impl InjectionPort for HostBridge {
    async fn inject(&self, tab: &Tab) -> std::result::Result<(), InjectionError> {
        self.sidebar_call(HostRequest::Inject { tab: tab.clone() })
            .await
    }

    async fn remove(&self, tab: &Tab) -> std::result::Result<(), InjectionError> {
        self.sidebar_call(HostRequest::Remove { tab: tab.clone() })
            .await
    }
}

impl AnnotationCountPort for HostBridge {
    async fn fetch_count(&self, url: &str, api_url: &str) -> Result<u64> {
        let response = self
            .request(HostRequest::CountAnnotations {
                url: url.to_string(),
                api_url: api_url.to_string(),
            })
            .await?;

        if let Some(error) = response.error {
            return Err(Error::annotation_count(error.to_string()));
        }

        response
            .result
            .as_ref()
            .and_then(parse_annotation_count)
            .ok_or_else(|| Error::annotation_count(format!("malformed count for {}", url)))
    }
}

impl TabsPort for HostBridge {
    async fn get(&self, tab_id: TabId) -> Option<Tab> {
        let response = match self.request(HostRequest::GetTab { tab_id }).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Tab lookup for {} failed: {}", tab_id, e);
                return None;
            }
        };

        if let Some(error) = response.error {
            debug!("Tab {} unavailable: {}", tab_id, error);
            return None;
        }

        match response.result {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value(value) {
                Ok(tab) => Some(tab),
                Err(e) => {
                    warn!("Malformed tab {} from host: {}", tab_id, e);
                    None
                }
            },
        }
    }
}

impl ActionIndicator for HostBridge {
    fn update(&self, tab_id: TabId, record: &TabRecord) {
        self.notify(HostNotification::ActionUpdate {
            tab_id,
            record: record.clone(),
        });
    }
}

impl HelpSurface for HostBridge {
    fn show_error(&self, tab: &Tab, error: &InjectionError) {
        self.notify(HostNotification::HelpShow {
            tab: tab.clone(),
            error: error.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabside_core::{InjectionErrorKind, TabStatus};

    fn bridge(timeout_ms: u64) -> (HostBridge, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        (HostBridge::new(tx, Duration::from_millis(timeout_ms)), rx)
    }

    /// Answer the next request line with `result`/`error`
    fn answer_next(
        bridge: &HostBridge,
        mut rx: mpsc::Receiver<String>,
        result: Option<Value>,
        error: Option<Value>,
    ) -> tokio::task::JoinHandle<Value> {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            let line = rx.recv().await.unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            let id = request["id"].as_u64().unwrap();
            assert!(bridge.handle_response(id, result, error).await);
            request
        })
    }

    #[tokio::test]
    async fn test_inject_success() {
        let (bridge, rx) = bridge(1000);
        let host = answer_next(&bridge, rx, Some(Value::Null), None);

        let tab = Tab::new(TabId(4)).with_url("https://example.com");
        assert!(bridge.inject(&tab).await.is_ok());

        let request = host.await.unwrap();
        assert_eq!(request["method"], "sidebar.inject");
        assert_eq!(request["params"]["tab"]["id"], 4);
    }

    #[tokio::test]
    async fn test_inject_failure_is_typed() {
        let (bridge, rx) = bridge(1000);
        let _host = answer_next(
            &bridge,
            rx,
            None,
            Some(json!({"type": "restricted-url", "message": "chrome://newtab"})),
        );

        let err = bridge.inject(&Tab::new(TabId(42))).await.unwrap_err();
        assert_eq!(err.kind, InjectionErrorKind::RestrictedUrl);
        assert_eq!(err.message, "chrome://newtab");
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let (bridge, _rx) = bridge(20);

        let err = bridge
            .request(HostRequest::GetTab { tab_id: TabId(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BridgeTimeout { .. }));
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_timeout_becomes_unknown_injection_error() {
        let (bridge, _rx) = bridge(20);
        let err = bridge.remove(&Tab::new(TabId(1))).await.unwrap_err();
        assert_eq!(err.kind, InjectionErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_closed_output_fails_fast() {
        let (bridge, rx) = bridge(1000);
        drop(rx);

        let err = bridge
            .request(HostRequest::GetTab { tab_id: TabId(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelSend { .. }));
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_get_tab() {
        let (bridge, rx) = bridge(1000);
        let _host = answer_next(
            &bridge,
            rx,
            Some(json!({"id": 8, "url": "https://example.com", "status": "complete"})),
            None,
        );

        let tab = bridge.get(TabId(8)).await.unwrap();
        assert_eq!(tab.status, Some(TabStatus::Complete));
    }

    #[tokio::test]
    async fn test_get_missing_tab() {
        let (bridge, rx) = bridge(1000);
        let _host = answer_next(&bridge, rx, Some(Value::Null), None);
        assert!(bridge.get(TabId(8)).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_count_shapes() {
        let (bridge, rx) = bridge(1000);
        let _host = answer_next(&bridge, rx, Some(json!({"total": 6})), None);
        assert_eq!(
            bridge
                .fetch_count("https://example.com", "https://hypothes.is/api")
                .await
                .unwrap(),
            6
        );

        let (bridge, rx) = self::bridge(1000);
        let _host = answer_next(&bridge, rx, None, Some(json!("offline")));
        assert!(bridge
            .fetch_count("https://example.com", "https://hypothes.is/api")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_indicator_notification_has_no_id() {
        let (bridge, mut rx) = bridge(1000);

        bridge.update(TabId(3), &TabRecord::new(TabId(3)));

        let line = rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["method"], "action.update");
        assert!(value.get("id").is_none());
        assert_eq!(bridge.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_all_releases_waiters() {
        let (bridge, _rx) = bridge(5000);
        let waiting = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.inject(&Tab::new(TabId(1))).await })
        };

        while bridge.pending_count().await == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(bridge.cancel_all().await, 1);

        let err = waiting.await.unwrap().unwrap_err();
        assert_eq!(err.kind, InjectionErrorKind::Unknown);
    }
}
