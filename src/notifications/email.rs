//! E-mail channel delivery. `spec.md` §1 "contemplates" this channel and
//! §3 lists it in `AlertChannel.kind`; grounded on the teacher's own
//! `lettre` dependency declaration (`builder`, `hostname`, `smtp-transport`,
//! `tokio1-rustls-tls`), which has no call site in the retrieved teacher
//! source to port — this module follows `lettre`'s own documented
//! `Message`/`AsyncSmtpTransport<Tokio1Executor>` API directly.
//!
//! SMTP transport settings (`SMTP_HOST`/`PORT`/`USERNAME`/`PASSWORD`/`FROM`)
//! come from `WorkerConfig`, not the channel's own config map — they are
//! deployment-wide infrastructure, not a tenant secret. The channel's config
//! map recognizes a single key: `to`, the recipient address.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::WorkerConfig;
use crate::models::AlertChannel;

use super::NotificationContext;

pub async fn send(
    config: &WorkerConfig,
    channel: &AlertChannel,
    ctx: NotificationContext<'_>,
) -> Result<(), String> {
    let to = channel
        .config
        .get("to")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "email channel missing 'to' in config".to_string())?;

    let smtp_host = config
        .smtp_host
        .as_deref()
        .ok_or_else(|| "SMTP_HOST is not configured".to_string())?;
    let from = config
        .smtp_from
        .as_deref()
        .ok_or_else(|| "SMTP_FROM is not configured".to_string())?;

    let incident = &ctx.incident;
    let subject = format!("[{}] {} — {}", incident.status.as_str(), ctx.monitor_name, ctx.rule_name);
    let body = format!(
        "{}\n\nmonitor: {} ({})\nrule: {}\nstarted_at: {}\nresolved_at: {}\n",
        incident.trigger_value,
        ctx.monitor_name,
        ctx.monitor_target,
        ctx.rule_name,
        incident.started_at,
        incident.resolved_at.as_deref().unwrap_or("-"),
    );

    let message = Message::builder()
        .from(from.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
        .to(to.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
        .subject(subject)
        .body(body)
        .map_err(|e| e.to_string())?;

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
        .map_err(|e| e.to_string())?
        .port(config.smtp_port);
    if let (Some(user), Some(pass)) = (config.smtp_username.as_deref(), config.smtp_password.as_deref()) {
        builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
    }
    let transport = builder.build();

    transport
        .send(message)
        .await
        .map(|_| ())
        .map_err(|e| e.to_string())
}
