//! Per-channel-kind delivery. Each submodule formats the §6 wire payload
//! for its channel kind and POSTs/sends it; `notifier.rs` dispatches to
//! whichever of these matches the channel's `kind`.

pub mod discord;
pub mod email;
pub mod webhook;

use crate::models::{AlertChannel, UnnotifiedIncident};

/// Everything a channel payload needs, gathered once per incident. The
/// `Store::get_unnotified_incidents` join (§4.4) already carries the
/// monitor/rule names the notifier needs, so no extra per-incident fetch
/// is required before dispatch.
pub type NotificationContext<'a> = &'a UnnotifiedIncident;

/// Dispatches to the channel-kind-specific sender. Returns `Err` with a
/// human-readable message on delivery failure; the caller decides the
/// retry/mark-notified policy.
pub async fn deliver(
    client: &reqwest::Client,
    config: &crate::config::WorkerConfig,
    channel: &AlertChannel,
    ctx: NotificationContext<'_>,
) -> Result<(), String> {
    use crate::models::ChannelKind;
    match channel.kind {
        ChannelKind::Webhook => webhook::send(client, channel, ctx).await,
        ChannelKind::Discord => discord::send(client, channel, ctx).await,
        ChannelKind::Email => email::send(config, channel, ctx).await,
    }
}
