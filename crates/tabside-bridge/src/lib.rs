//! tabside-bridge - Host bridge for tabside
//!
//! Speaks newline-delimited JSON with the browser host process: inbound
//! lines carry browser events, storage changes and responses; outbound lines
//! carry port requests and indicator/help notifications.
//!
//! ## Public API
//!
//! - [`InboundMessage`] - one parsed line from the host
//! - [`HostRequest`], [`HostNotification`] - outbound line builders
//! - [`RequestTracker`] - id allocation and response routing
//! - [`HostBridge`] - implements every collaborator port over the channel

pub mod host;
pub mod protocol;
pub mod tracker;

pub use host::{HostBridge, HostPorts};
pub use protocol::{HostNotification, HostRequest, InboundMessage};
pub use tracker::{HostResponse, RequestTracker};
