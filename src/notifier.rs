//! Notifier: delivers unresolved incidents to their attached channels.
//!
//! Generalizes the teacher's `checker::{log_alert, process_repeat_
//! notifications}` and the payload shapes sketched in the teacher's
//! (inconsistent) `src/notifications.rs` into the exact FIFO,
//! at-least-once-attempt semantics of `spec.md` §4.6, refined per §9's
//! bounded-retry variant: each channel POST gets `WORKER_RETRY_COUNT`
//! bounded retries (reusing the worker pool's own retry constants) before
//! being logged as a delivery failure, and `notified_at` is still set once
//! the retry budget is exhausted — notifications must not be dropped
//! silently.

use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::models::UnnotifiedIncident;
use crate::notifications;
use crate::store::Store;

const BATCH_LIMIT: u32 = 100;

/// Runs one notifier pass: up to `BATCH_LIMIT` unnotified incidents, oldest
/// first, each delivered to every enabled channel attached to its rule.
/// Returns (incidents processed, channel deliveries that failed).
pub async fn notify_tick(store: &dyn Store, client: &reqwest::Client, config: &WorkerConfig) -> (u32, u32) {
    let incidents = match store.get_unnotified_incidents(BATCH_LIMIT).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "failed to load unnotified incidents");
            return (0, 0);
        }
    };

    let mut processed = 0u32;
    let mut delivery_failures = 0u32;

    for unnotified in &incidents {
        delivery_failures += process_incident(store, client, config, unnotified).await;
        processed += 1;
    }

    if processed > 0 {
        info!(processed, delivery_failures, "notifier pass complete");
    }
    (processed, delivery_failures)
}

/// Delivers one incident to every enabled channel attached to its rule,
/// then unconditionally marks it notified (guarded by `notified_at IS
/// NULL` inside the store, so a re-entrant tick stays idempotent per §8
/// invariant 4). Returns the number of channels that failed delivery.
async fn process_incident(
    store: &dyn Store,
    client: &reqwest::Client,
    config: &WorkerConfig,
    unnotified: &UnnotifiedIncident,
) -> u32 {
    let incident_id = &unnotified.incident.id;

    let channels = match store.channels_for_rule(&unnotified.incident.alert_rule_id).await {
        Ok(c) => c,
        Err(e) => {
            warn!(incident_id = %incident_id, error = %e, "failed to load channels for rule");
            Vec::new()
        }
    };

    let mut failures = 0u32;
    for channel in channels.iter().filter(|c| c.enabled) {
        match deliver_with_retry(client, config, channel, unnotified).await {
            Ok(()) => {
                info!(incident_id = %incident_id, channel_id = %channel.id, kind = channel.kind.as_str(), "incident delivered");
            }
            Err(e) => {
                failures += 1;
                warn!(incident_id = %incident_id, channel_id = %channel.id, kind = channel.kind.as_str(), error = %e, "delivery failed");
            }
        }
    }

    match store.mark_as_notified(incident_id).await {
        Ok(true) => {}
        Ok(false) => warn!(incident_id = %incident_id, "incident was already notified by a concurrent tick"),
        Err(e) => warn!(incident_id = %incident_id, error = %e, "failed to mark incident notified"),
    }

    failures
}

/// `WORKER_RETRY_COUNT`-bounded retries before giving up on one channel,
/// per `SPEC_FULL.md` §4.6's refinement of the baseline at-least-once
/// attempt.
async fn deliver_with_retry(
    client: &reqwest::Client,
    config: &WorkerConfig,
    channel: &crate::models::AlertChannel,
    unnotified: &UnnotifiedIncident,
) -> Result<(), WorkerError> {
    let mut attempt = 0u32;
    loop {
        match notifications::deliver(client, config, channel, unnotified).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < config.worker_retry_count => {
                attempt += 1;
                tokio::time::sleep(config.worker_retry_delay).await;
                let _ = &e;
            }
            Err(e) => return Err(WorkerError::DeliveryError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Incident, IncidentStatus, TriggerKind};

    fn sample() -> UnnotifiedIncident {
        UnnotifiedIncident {
            incident: Incident {
                id: "inc-1".to_string(),
                monitor_id: "mon-1".to_string(),
                alert_rule_id: "rule-1".to_string(),
                started_at: "2026-01-01T00:00:00Z".to_string(),
                resolved_at: None,
                status: IncidentStatus::Open,
                trigger_value: "down for 3 consecutive checks".to_string(),
                created_at: "2026-01-01T00:00:00Z".to_string(),
                notified_at: None,
            },
            monitor_id: "mon-1".to_string(),
            monitor_name: "example".to_string(),
            monitor_target: "http://example.test/".to_string(),
            rule_name: "example down".to_string(),
            trigger: TriggerKind::Down,
        }
    }

    #[test]
    fn unnotified_incident_carries_everything_a_payload_needs() {
        let u = sample();
        assert_eq!(u.incident.status, IncidentStatus::Open);
        assert_eq!(u.trigger, TriggerKind::Down);
    }
}
