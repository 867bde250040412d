//! Discord channel delivery: an embed POST to the channel's `webhook_url`.

use serde::Serialize;

use crate::models::{AlertChannel, IncidentStatus};

use super::NotificationContext;

const COLOR_OPEN: u32 = 0xE74C3C; // red
const COLOR_RESOLVED: u32 = 0x2ECC71; // green

#[derive(Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

#[derive(Serialize)]
struct DiscordPayload {
    embeds: [Embed; 1],
}

pub async fn send(
    client: &reqwest::Client,
    channel: &AlertChannel,
    ctx: NotificationContext<'_>,
) -> Result<(), String> {
    let webhook_url = channel
        .config
        .get("webhook_url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "discord channel missing 'webhook_url' in config".to_string())?;

    let incident = &ctx.incident;
    let (color, timestamp) = match incident.status {
        IncidentStatus::Open => (COLOR_OPEN, incident.started_at.clone()),
        IncidentStatus::Resolved => (
            COLOR_RESOLVED,
            incident
                .resolved_at
                .clone()
                .unwrap_or_else(|| incident.started_at.clone()),
        ),
    };

    let payload = DiscordPayload {
        embeds: [Embed {
            title: format!("{} — {}", ctx.monitor_name, ctx.rule_name),
            description: incident.trigger_value.clone(),
            color,
            timestamp,
        }],
    };

    let response = client
        .post(webhook_url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("discord webhook returned status {}", response.status()));
    }
    Ok(())
}
