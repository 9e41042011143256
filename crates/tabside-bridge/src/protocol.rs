//! Newline-delimited JSON protocol between tabside and the browser host
//!
//! Inbound (host → tabside), one object per line, tagged by `type`:
//!
//! ```json
//! {"type":"event","event":{"kind":"action_clicked","tab":{"id":42}}}
//! {"type":"storage","key":"state","new_value":"{...}"}
//! {"type":"response","id":7,"result":{"id":42,"status":"complete"}}
//! {"type":"quit"}
//! ```
//!
//! Outbound requests carry an `id` the host must echo in its response;
//! notifications carry none and expect no answer.

use serde::Deserialize;
use serde_json::{json, Value};

use tabside_app::services::IndicatorBadge;
use tabside_core::prelude::*;
use tabside_core::{BrowserEvent, InjectionError, StorageChange, Tab, TabId, TabRecord};

/// One line from the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Event {
        event: BrowserEvent,
    },
    Storage {
        key: String,
        #[serde(default)]
        new_value: Option<String>,
    },
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    Quit,
}

impl InboundMessage {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| Error::protocol(format!("Unparseable host line: {}", e)))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, InboundMessage::Response { .. })
    }

    /// The storage change carried by a `storage` line
    pub fn storage_change(&self) -> Option<StorageChange> {
        match self {
            InboundMessage::Storage { key, new_value } => {
                Some(StorageChange::new(key.clone(), new_value.clone()))
            }
            _ => None,
        }
    }
}

/// Requests that expect a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    GetTab { tab_id: TabId },
    Inject { tab: Tab },
    Remove { tab: Tab },
    CountAnnotations { url: String, api_url: String },
}

impl HostRequest {
    pub fn method(&self) -> &'static str {
        match self {
            HostRequest::GetTab { .. } => "tabs.get",
            HostRequest::Inject { .. } => "sidebar.inject",
            HostRequest::Remove { .. } => "sidebar.remove",
            HostRequest::CountAnnotations { .. } => "annotations.count",
        }
    }

    /// Build the request line (without trailing newline)
    pub fn build(&self, id: u64) -> String {
        let params = match self {
            HostRequest::GetTab { tab_id } => json!({ "tabId": tab_id }),
            HostRequest::Inject { tab } | HostRequest::Remove { tab } => json!({ "tab": tab }),
            HostRequest::CountAnnotations { url, api_url } => {
                json!({ "url": url, "apiUrl": api_url })
            }
        };

        json!({
            "id": id,
            "method": self.method(),
            "params": params,
        })
        .to_string()
    }
}

/// Fire-and-forget messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNotification {
    ActionUpdate { tab_id: TabId, record: TabRecord },
    HelpShow { tab: Tab, error: InjectionError },
}

impl HostNotification {
    pub fn method(&self) -> &'static str {
        match self {
            HostNotification::ActionUpdate { .. } => "action.update",
            HostNotification::HelpShow { .. } => "help.show",
        }
    }

    pub fn build(&self) -> String {
        let params = match self {
            HostNotification::ActionUpdate { tab_id, record } => {
                let badge = IndicatorBadge::for_record(record);
                json!({
                    "tabId": tab_id,
                    "state": record.state,
                    "active": badge.active,
                    "errored": badge.errored,
                    "badgeText": badge.text,
                    "annotationCount": record.annotation_count,
                })
            }
            HostNotification::HelpShow { tab, error } => json!({
                "tabId": tab.id,
                "url": tab.url,
                "error": error,
            }),
        };

        json!({
            "method": self.method(),
            "params": params,
        })
        .to_string()
    }
}

/// Read an injection failure out of a response's `error` value.
///
/// Anything that is not a well-formed `{type, message}` object becomes an
/// `unknown` failure carrying the raw value.
pub fn parse_injection_error(error: &Value) -> InjectionError {
    match serde_json::from_value::<InjectionError>(error.clone()) {
        Ok(parsed) => parsed,
        Err(_) => match error.as_str() {
            Some(message) => InjectionError::unknown(message),
            None => InjectionError::unknown(error.to_string()),
        },
    }
}

/// Read an annotation count: a bare number or an object with `total`
pub fn parse_annotation_count(result: &Value) -> Option<u64> {
    result
        .as_u64()
        .or_else(|| result.get("total").and_then(Value::as_u64))
}
