//! Typed access to the dashboard backend (alerts, packets, ports, events).

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{DetectionEvent, IsolateRequest, PortStatus, RecentPacket, SwitchPort};
