//! Payloads of the dashboard backend that the client decodes.
//! Anything the pages only display verbatim stays `serde_json::Value`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend timestamps may come without an offset; those are taken as UTC.
mod backend_time {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    use crate::identity::parse_timestamp as parse;

    pub fn required<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{raw}'")))
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) => parse(&raw).map(Some).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Active,
    Isolated,
    Inactive,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwitchPort {
    pub port_id: String,
    pub port_number: i64,
    pub status: PortStatus,
    #[serde(default)]
    pub device_ip: Option<String>,
    #[serde(default)]
    pub device_mac: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub vlan: Option<i64>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub bytes_sent: f64,
    #[serde(default)]
    pub bytes_received: f64,
    #[serde(default)]
    pub errors: i64,
    #[serde(default)]
    pub drops: i64,
    #[serde(default)]
    pub isolation_reason: Option<String>,
    #[serde(default, deserialize_with = "backend_time::optional")]
    pub isolated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub isolated_by: Option<String>,
    #[serde(default, deserialize_with = "backend_time::optional")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub alert_event_id: Option<String>,
    #[serde(default, deserialize_with = "backend_time::optional")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SwitchPort {
    pub fn is_isolated(&self) -> bool { self.status == PortStatus::Isolated }
}

/// Body of `POST /ports/{id}/isolate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsolateRequest {
    pub reason: String,
    pub isolated_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_event_id: Option<String>,
}

pub const MAX_ISOLATION_REASON: usize = 500;

impl IsolateRequest {
    /// Manual isolation from the ports page.
    pub fn manual<S: Into<String>>(reason: S) -> Self {
        Self { reason: reason.into(), isolated_by: "manual".into(), alert_event_id: None }
    }

    /// Isolation in response to a detection event.
    pub fn for_alert<S: Into<String>>(reason: S, event_id: S) -> Self {
        Self { reason: reason.into(), isolated_by: "alert".into(), alert_event_id: Some(event_id.into()) }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("isolation reason is required".into());
        }
        if self.reason.chars().count() > MAX_ISOLATION_REASON {
            return Err(format!("isolation reason exceeds {MAX_ISOLATION_REASON} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecentPacket {
    #[serde(deserialize_with = "backend_time::required")]
    pub timestamp: DateTime<Utc>,
    pub src_ip: String,
    pub classification: String,
}

impl RecentPacket {
    pub fn is_benign(&self) -> bool { self.classification.eq_ignore_ascii_case("benign") || self.classification.eq_ignore_ascii_case("normal") }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectionEvent {
    pub event_id: String,
    #[serde(deserialize_with = "backend_time::required")]
    pub timestamp: DateTime<Utc>,
    pub attack_type: String,
    pub severity: String,
    pub model_name: String,
    pub processing_latency_ms: f64,
}
