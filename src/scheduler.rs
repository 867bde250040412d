//! Four independently-cadenced jobs on a single cooperative timer:
//! health-check, ssl-check, alert-evaluate, notify (`spec.md` §4.3).
//!
//! Generalizes the teacher's single `checker::run_checker` loop — which
//! polled one "elapsed >= Duration" condition per concern inside one big
//! `loop {}` — into `tokio::time::interval`s per job with
//! `MissedTickBehavior::Skip`, matching §4.3's "if a tick takes longer than
//! its period, the next tick is skipped rather than queued" rule exactly
//! (the teacher's own `Instant`-diff pattern only approximates this; the
//! stdlib interval type gives it for free).

use std::sync::Arc;

use dashmap::DashSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::alert_evaluator;
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::event_bus::EventBus;
use crate::health::SchedulerStatus;
use crate::models::{now_iso, Event, EventPayload, Monitor, MonitorCheck, MonitorKind};
use crate::notifier;
use crate::probe;
use crate::store::Store;
use crate::worker_pool::{SubmitError, Task, WorkerPool};

/// Owns the four timers plus the shared collaborators every job reads from
/// or writes to. Constructed once per process.
pub struct Scheduler {
    store: Arc<dyn Store>,
    bus: EventBus,
    pool: WorkerPool,
    http_client: reqwest::Client,
    config: WorkerConfig,
    /// Monitor ids with a health-check probe currently in flight — enforces
    /// the "at most one probe in flight per monitor" invariant (§5) across
    /// ticks, since a slow probe can outlive the tick that dispatched it.
    in_flight: Arc<DashSet<String>>,
    status: Arc<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        bus: EventBus,
        pool: WorkerPool,
        http_client: reqwest::Client,
        config: WorkerConfig,
        status: Arc<SchedulerStatus>,
    ) -> Self {
        Scheduler {
            store,
            bus,
            pool,
            http_client,
            config,
            in_flight: Arc::new(DashSet::new()),
            status,
        }
    }

    /// Runs until `cancel` fires, then stops the worker pool and closes the
    /// event bus in that order (§4.3's graceful shutdown sequence).
    pub async fn run(self, cancel: CancellationToken) {
        let mut health_tick = tokio::time::interval(self.config.health_check_period);
        health_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ssl_tick = tokio::time::interval(self.config.ssl_check_period);
        ssl_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut eval_tick = tokio::time::interval(self.config.alert_eval_period);
        eval_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut notify_tick_timer = tokio::time::interval(self.config.notify_period);
        notify_tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let drain_cancel = cancel.clone();
        let drain_pool_results = drain_results(&self.pool, drain_cancel);
        tokio::pin!(drain_pool_results);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("scheduler shutdown requested");
                    break;
                }
                _ = health_tick.tick() => {
                    self.health_check_tick(&cancel).await;
                    self.status.record_tick("health-check");
                }
                _ = ssl_tick.tick() => {
                    self.ssl_check_tick(&cancel).await;
                    self.status.record_tick("ssl-check");
                }
                _ = eval_tick.tick() => {
                    let now = now_iso();
                    let (created, resolved) = alert_evaluator::evaluate_all(self.store.as_ref(), &self.bus, &now).await;
                    if created > 0 || resolved > 0 {
                        info!(created, resolved, "alert-evaluate tick");
                    }
                    self.status.record_tick("alert-evaluate");
                }
                _ = notify_tick_timer.tick() => {
                    notifier::notify_tick(self.store.as_ref(), &self.http_client, &self.config).await;
                    self.status.record_tick("notify");
                }
                _ = &mut drain_pool_results => {}
            }
        }

        self.pool.stop().await;
        self.bus.close();
    }

    /// §4.3 step 1: dispatch a probe task for every monitor currently due.
    async fn health_check_tick(&self, cancel: &CancellationToken) {
        let now = now_iso();
        let due = match self.store.get_monitors_needing_check(&now).await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!(error = %e, "health-check tick: failed to load due monitors");
                return;
            }
        };

        for monitor in due {
            if !monitor.enabled {
                continue;
            }
            if !self.in_flight.insert(monitor.id.clone()) {
                continue; // already in flight; never double-dispatch (§5).
            }

            let task = HealthCheckTask {
                monitor,
                store: self.store.clone(),
                bus: self.bus.clone(),
                http_client: self.http_client.clone(),
                in_flight: self.in_flight.clone(),
                cancel: cancel.clone(),
            };
            let monitor_id = task.monitor.id.clone();
            if let Err(e) = self.pool.submit(task) {
                self.in_flight.remove(&monitor_id);
                match e {
                    SubmitError::QueueFull => warn!(monitor_id = %monitor_id, "worker pool queue full, dropping this tick's probe"),
                    SubmitError::ShuttingDown => {}
                }
            }
        }
    }

    /// §4.3 step 2: SSL-enabled HTTPS monitors get an independent SSL probe.
    async fn ssl_check_tick(&self, cancel: &CancellationToken) {
        let due = match self.store.get_monitors_needing_ssl_check().await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!(error = %e, "ssl-check tick: failed to load monitors");
                return;
            }
        };

        for monitor in due {
            let task = SslCheckTask {
                monitor,
                store: self.store.clone(),
                bus: self.bus.clone(),
                cancel: cancel.clone(),
            };
            if let Err(SubmitError::QueueFull) = self.pool.submit(task) {
                warn!("worker pool queue full, dropping this tick's ssl probe");
            }
        }
    }
}

/// Drains the worker pool's result stream purely to log retry-exhausted
/// failures; actual persistence happens inside each `Task::execute` (§4.2's
/// "lazy sequence of completion records" is an observability channel, not
/// the write path).
async fn drain_results(pool: &WorkerPool, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            result = pool.try_recv_result() => {
                match result {
                    Some(r) => {
                        if let Some(e) = r.error {
                            warn!(task = %r.name, error = %e, "task failed after exhausting retries");
                        }
                    }
                    None => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
                }
            }
        }
    }
}

/// One health-check probe for one monitor: runs the kind-appropriate
/// probe, persists the resulting `MonitorCheck`, advances
/// `last_checked_at`, and publishes a `monitor_check` event — all inside
/// `execute`, so the worker pool's own retry policy covers storage
/// failures, not "the site was down" (a down probe is a successful check
/// row, never a task error).
struct HealthCheckTask {
    monitor: Monitor,
    store: Arc<dyn Store>,
    bus: EventBus,
    http_client: reqwest::Client,
    in_flight: Arc<DashSet<String>>,
    cancel: CancellationToken,
}

impl Drop for HealthCheckTask {
    fn drop(&mut self) {
        self.in_flight.remove(&self.monitor.id);
    }
}

impl Task for HealthCheckTask {
    fn name(&self) -> String {
        format!("health-check:{}", self.monitor.id)
    }

    fn execute(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), WorkerError>> + Send + '_>> {
        Box::pin(async move {
            let timeout = std::time::Duration::from_secs(self.monitor.timeout_seconds as u64);

            let (success, status_code, elapsed_ms, error) = match self.monitor.kind {
                MonitorKind::Http | MonitorKind::Https => {
                    let codes: Vec<u16> = self.monitor.expected_status_codes.clone();
                    let r = probe::http_probe(
                        &self.http_client,
                        &self.monitor.target,
                        timeout,
                        &codes,
                        self.monitor.body_keyword.as_deref(),
                        &self.cancel,
                    )
                    .await;
                    (r.success, r.status_code, r.elapsed_ms, r.error)
                }
                MonitorKind::Tcp => {
                    let (host, port) = split_host_port(&self.monitor.target);
                    let r = probe::tcp_probe(&host, port, timeout, &self.cancel).await;
                    (r.success, None, r.elapsed_ms, r.error)
                }
                MonitorKind::Icmp => {
                    let host = strip_scheme(&self.monitor.target);
                    let r = probe::icmp_probe(&host, timeout, &self.cancel).await;
                    (r.success, None, r.elapsed_ms, r.error)
                }
            };

            let now = now_iso();
            let check = MonitorCheck {
                id: uuid::Uuid::new_v4().to_string(),
                monitor_id: self.monitor.id.clone(),
                checked_at: now.clone(),
                success,
                status_code,
                response_time_ms: Some(elapsed_ms),
                ssl_valid: None,
                ssl_expires_at: None,
                error_message: error.as_ref().map(|e| e.to_string()),
            };

            self.store.save_check(check.clone()).await?;
            self.store.update_last_checked_at(&self.monitor.id, &now).await?;

            self.bus.publish(
                &self.monitor.tenant_id,
                Event::new(EventPayload::MonitorCheck {
                    monitor_id: check.monitor_id,
                    monitor_name: self.monitor.name.clone(),
                    success: check.success,
                    status_code: check.status_code,
                    response_time_ms: check.response_time_ms,
                    ssl_valid: check.ssl_valid,
                    ssl_expires_at: check.ssl_expires_at,
                    error_message: check.error_message,
                    checked_at: check.checked_at,
                }),
            );

            Ok(())
        })
    }
}

/// One SSL probe for one HTTPS monitor with SSL checking enabled (§4.3
/// step 2). A separate `MonitorCheck` row from the health-check probe.
struct SslCheckTask {
    monitor: Monitor,
    store: Arc<dyn Store>,
    bus: EventBus,
    cancel: CancellationToken,
}

impl Task for SslCheckTask {
    fn name(&self) -> String {
        format!("ssl-check:{}", self.monitor.id)
    }

    fn execute(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), WorkerError>> + Send + '_>> {
        Box::pin(async move {
            let timeout = std::time::Duration::from_secs(self.monitor.timeout_seconds as u64);
            let (host, port) = split_host_port_default(&self.monitor.target, 443);

            let result = probe::ssl_probe(&host, port, timeout, &self.cancel).await;

            let now = now_iso();
            let check = MonitorCheck {
                id: uuid::Uuid::new_v4().to_string(),
                monitor_id: self.monitor.id.clone(),
                checked_at: now,
                success: result.valid,
                status_code: None,
                response_time_ms: None,
                ssl_valid: Some(result.valid),
                ssl_expires_at: result.expires_at.clone(),
                error_message: result.error.clone(),
            };

            self.store.save_check(check.clone()).await?;

            self.bus.publish(
                &self.monitor.tenant_id,
                Event::new(EventPayload::MonitorCheck {
                    monitor_id: check.monitor_id,
                    monitor_name: self.monitor.name.clone(),
                    success: check.success,
                    status_code: None,
                    response_time_ms: None,
                    ssl_valid: check.ssl_valid,
                    ssl_expires_at: check.ssl_expires_at,
                    error_message: check.error_message,
                    checked_at: check.checked_at,
                }),
            );

            Ok(())
        })
    }
}

fn strip_scheme(target: &str) -> String {
    target
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or(target)
        .to_string()
}

fn split_host_port(target: &str) -> (String, u16) {
    split_host_port_default(target, 0)
}

fn split_host_port_default(target: &str, default_port: u16) -> (String, u16) {
    let without_scheme = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host_port = without_scheme.split('/').next().unwrap_or(without_scheme);
    match host_port.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(default_port)),
        None => (host_port.to_string(), default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_host_port_handles_scheme_and_explicit_port() {
        assert_eq!(split_host_port_default("https://example.com:8443/x", 443), ("example.com".to_string(), 8443));
        assert_eq!(split_host_port_default("example.com", 443), ("example.com".to_string(), 443));
        assert_eq!(split_host_port("tcp-target.test:5432"), ("tcp-target.test".to_string(), 5432));
    }

    #[test]
    fn strip_scheme_drops_protocol_and_path() {
        assert_eq!(strip_scheme("http://example.com/health"), "example.com");
        assert_eq!(strip_scheme("10.0.0.5"), "10.0.0.5");
    }
}
