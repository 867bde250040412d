//! Generic webhook channel delivery. Payload shape matches `spec.md` §6's
//! generic webhook JSON; the original shape lives in the teacher's
//! `src/notifications.rs` (`WebhookPayload`/`WebhookMonitor`/
//! `WebhookIncident`), rebuilt here with this crate's own entity types.

use serde::Serialize;

use crate::models::AlertChannel;

use super::NotificationContext;

#[derive(Serialize)]
struct WebhookMonitor {
    id: String,
    name: String,
    url: String,
}

#[derive(Serialize)]
struct WebhookRule {
    id: String,
    name: String,
    trigger_type: &'static str,
}

#[derive(Serialize)]
struct WebhookPayload {
    incident_id: String,
    monitor: WebhookMonitor,
    rule: WebhookRule,
    status: &'static str,
    trigger_value: String,
    started_at: String,
    resolved_at: Option<String>,
}

pub async fn send(
    client: &reqwest::Client,
    channel: &AlertChannel,
    ctx: NotificationContext<'_>,
) -> Result<(), String> {
    let url = channel
        .config
        .get("url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "webhook channel missing 'url' in config".to_string())?;

    let incident = &ctx.incident;
    let payload = WebhookPayload {
        incident_id: incident.id.clone(),
        monitor: WebhookMonitor {
            id: ctx.monitor_id.clone(),
            name: ctx.monitor_name.clone(),
            url: ctx.monitor_target.clone(),
        },
        rule: WebhookRule {
            id: incident.alert_rule_id.clone(),
            name: ctx.rule_name.clone(),
            trigger_type: ctx.trigger.as_str(),
        },
        status: incident.status.as_str(),
        trigger_value: incident.trigger_value.clone(),
        started_at: incident.started_at.clone(),
        resolved_at: incident.resolved_at.clone(),
    };

    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("webhook returned status {}", response.status()));
    }
    Ok(())
}
