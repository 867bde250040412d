use serde::{Deserialize, Serialize};

/// Current UTC timestamp formatted the way every timestamp in this crate is
/// persisted and serialized: `2026-02-10T14:00:00Z`.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Http,
    Https,
    Tcp,
    Icmp,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Http => "http",
            MonitorKind::Https => "https",
            MonitorKind::Tcp => "tcp",
            MonitorKind::Icmp => "icmp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "http" => Some(MonitorKind::Http),
            "https" => Some(MonitorKind::Https),
            "tcp" => Some(MonitorKind::Tcp),
            "icmp" => Some(MonitorKind::Icmp),
            _ => None,
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, MonitorKind::Http | MonitorKind::Https)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Monitor {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub target: String,
    pub kind: MonitorKind,
    pub check_interval_seconds: u32,
    pub timeout_seconds: u32,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_keyword: Option<String>,
    /// Empty = fall back to the probe's default "2xx/3xx" acceptance range.
    #[serde(default)]
    pub expected_status_codes: Vec<u16>,
    pub ssl_check_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_alert_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Monitor {
    /// §3 invariant: timeout < interval.
    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval_seconds < 30 {
            return Err("check_interval_seconds must be at least 30".to_string());
        }
        if self.timeout_seconds < 1 {
            return Err("timeout_seconds must be at least 1".to_string());
        }
        if self.timeout_seconds as u64 >= self.check_interval_seconds as u64 {
            return Err("timeout_seconds must be less than check_interval_seconds".to_string());
        }
        if self.target.trim().is_empty() {
            return Err("target must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorCheck {
    pub id: String,
    pub monitor_id: String,
    pub checked_at: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Webhook,
    Discord,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Webhook => "webhook",
            ChannelKind::Discord => "discord",
            ChannelKind::Email => "email",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "webhook" => Some(ChannelKind::Webhook),
            "discord" => Some(ChannelKind::Discord),
            "email" => Some(ChannelKind::Email),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlertChannel {
    pub id: String,
    pub tenant_id: String,
    pub kind: ChannelKind,
    pub name: String,
    pub enabled: bool,
    /// Recognized keys depend on `kind` — see `SPEC_FULL.md` §6/§4.6.
    pub config: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Down,
    SlowResponse,
    SslExpiry,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Down => "down",
            TriggerKind::SlowResponse => "slow_response",
            TriggerKind::SslExpiry => "ssl_expiry",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "down" => Some(TriggerKind::Down),
            "slow_response" => Some(TriggerKind::SlowResponse),
            "ssl_expiry" => Some(TriggerKind::SslExpiry),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlertRule {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// `None` = applies to every monitor in the tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_id: Option<String>,
    pub trigger: TriggerKind,
    pub threshold_value: i64,
    pub enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "open",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Incident {
    pub id: String,
    pub monitor_id: String,
    pub alert_rule_id: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    pub status: IncidentStatus,
    pub trigger_value: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_at: Option<String>,
}

/// Row shape returned by `get_unnotified_incidents`: the incident joined
/// with its monitor and rule names, for notifier convenience (§4.4).
#[derive(Debug, Clone)]
pub struct UnnotifiedIncident {
    pub incident: Incident,
    pub monitor_id: String,
    pub monitor_name: String,
    pub monitor_target: String,
    pub rule_name: String,
    pub trigger: TriggerKind,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MaintenanceWindow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    /// Seconds; 0 = one-shot (no recurrence).
    pub repeat_interval_seconds: u64,
    /// Empty = all tenant monitors.
    #[serde(default)]
    pub monitor_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}

/// List-incidents filter set, per §4.4.
#[derive(Debug, Default, Clone)]
pub struct IncidentFilter {
    pub tenant_id: Option<String>,
    pub monitor_id: Option<String>,
    pub status: Option<IncidentStatus>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Real-time event kinds published on the event bus (§4.7/§6).
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Connected,
    MonitorCheck {
        monitor_id: String,
        monitor_name: String,
        success: bool,
        status_code: Option<u16>,
        response_time_ms: Option<u32>,
        ssl_valid: Option<bool>,
        ssl_expires_at: Option<String>,
        error_message: Option<String>,
        checked_at: String,
    },
    IncidentCreated {
        incident: Incident,
    },
    IncidentResolved {
        incident: Incident,
    },
}

/// The wire envelope for every event-stream message (§6): `{type, data,
/// timestamp}`. `EventPayload` already carries `type` via its own tag, so
/// the envelope re-nests it under `data` to match the spec's exact shape.
#[derive(Debug, Serialize, Clone)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: EventPayload,
    pub timestamp: String,
}

impl Event {
    pub fn new(data: EventPayload) -> Self {
        let kind = match &data {
            EventPayload::Connected => "connected",
            EventPayload::MonitorCheck { .. } => "monitor_check",
            EventPayload::IncidentCreated { .. } => "incident_created",
            EventPayload::IncidentResolved { .. } => "incident_resolved",
        };
        Event {
            kind,
            data,
            timestamp: now_iso(),
        }
    }
}
