//! Typed persistence facade. `Store` is the trait the worker plane programs
//! against (scheduler, alert evaluator, notifier); `sqlite::SqliteStore` is
//! the only implementation, backed by `crate::db::Db`.

pub mod sqlite;

use async_trait::async_trait;

use crate::error::WorkerResult;
use crate::models::{
    AlertChannel, AlertRule, Incident, IncidentFilter, MaintenanceWindow, Monitor, MonitorCheck,
    Tenant, UnnotifiedIncident,
};

/// Cross-tenant worker-plane operations take no tenant parameter; every
/// other method is tenant-scoped, matching `SPEC_FULL.md`'s Open Question 1
/// resolution.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_tenant(&self, tenant: Tenant) -> WorkerResult<Tenant>;
    async fn get_tenant(&self, id: &str) -> WorkerResult<Tenant>;

    async fn create_monitor(&self, monitor: Monitor) -> WorkerResult<Monitor>;
    async fn get_monitor(&self, tenant_id: &str, id: &str) -> WorkerResult<Monitor>;
    async fn update_monitor(&self, monitor: Monitor) -> WorkerResult<Monitor>;
    async fn delete_monitor(&self, tenant_id: &str, id: &str) -> WorkerResult<()>;

    /// Monitors due for a health-check probe right now, ordered never-checked
    /// first then ascending id (§4.3 tie-break rule).
    async fn get_monitors_needing_check(&self, now: &str) -> WorkerResult<Vec<Monitor>>;

    /// Monitors with SSL checking enabled whose target is HTTPS (§4.3 step 2).
    async fn get_monitors_needing_ssl_check(&self) -> WorkerResult<Vec<Monitor>>;

    async fn save_check(&self, check: MonitorCheck) -> WorkerResult<MonitorCheck>;
    async fn update_last_checked_at(&self, monitor_id: &str, t: &str) -> WorkerResult<()>;

    /// Most recent N checks for a monitor, newest first.
    async fn recent_checks(&self, monitor_id: &str, limit: u32) -> WorkerResult<Vec<MonitorCheck>>;
    /// Most recent check with a non-null `ssl_expires_at`, if any.
    async fn latest_ssl_check(&self, monitor_id: &str) -> WorkerResult<Option<MonitorCheck>>;

    async fn create_channel(&self, channel: AlertChannel) -> WorkerResult<AlertChannel>;
    async fn get_channel(&self, tenant_id: &str, id: &str) -> WorkerResult<AlertChannel>;
    async fn delete_channel(&self, tenant_id: &str, id: &str) -> WorkerResult<()>;

    async fn create_rule(&self, rule: AlertRule) -> WorkerResult<AlertRule>;
    async fn get_rule(&self, tenant_id: &str, id: &str) -> WorkerResult<AlertRule>;
    async fn delete_rule(&self, tenant_id: &str, id: &str) -> WorkerResult<()>;
    /// Every enabled rule across every tenant (the evaluator runs cross-tenant).
    async fn all_enabled_rules(&self) -> WorkerResult<Vec<AlertRule>>;
    /// Enabled monitors a rule applies to: the named one, or every enabled
    /// monitor in the rule's tenant if `monitor_id` is unset.
    async fn monitors_for_rule(&self, rule: &AlertRule) -> WorkerResult<Vec<Monitor>>;
    async fn channels_for_rule(&self, rule_id: &str) -> WorkerResult<Vec<AlertChannel>>;

    /// Transactional; duplicate attachments are a no-op (§4.4/§8 idempotence law).
    async fn attach_channels(&self, rule_id: &str, channel_ids: &[String]) -> WorkerResult<()>;
    async fn detach_channels(&self, rule_id: &str, channel_ids: &[String]) -> WorkerResult<()>;

    async fn get_open_incident(
        &self,
        monitor_id: &str,
        rule_id: &str,
    ) -> WorkerResult<Option<Incident>>;
    async fn create_incident(&self, incident: Incident) -> WorkerResult<Incident>;
    /// Succeeds only if status was open; sets `resolved_at = now`. Idempotent:
    /// resolving an already-resolved incident is a no-op, not an error.
    async fn resolve_incident(&self, incident_id: &str) -> WorkerResult<Incident>;
    async fn list_incidents(&self, filter: IncidentFilter) -> WorkerResult<Vec<Incident>>;
    /// Oldest-first, capped, joined with monitor/rule names (§4.4).
    async fn get_unnotified_incidents(&self, limit: u32) -> WorkerResult<Vec<UnnotifiedIncident>>;
    /// Returns whether this call actually flipped `notified_at` (it is
    /// guarded by `notified_at IS NULL`), per §4.4/§8 invariant 4.
    async fn mark_as_notified(&self, incident_id: &str) -> WorkerResult<bool>;

    async fn create_maintenance_window(
        &self,
        window: MaintenanceWindow,
    ) -> WorkerResult<MaintenanceWindow>;
    async fn delete_maintenance_window(&self, tenant_id: &str, id: &str) -> WorkerResult<()>;
    /// Every maintenance window for a tenant, used by the evaluator's
    /// covering check (`crate::maintenance::covers`).
    async fn maintenance_windows_for_tenant(
        &self,
        tenant_id: &str,
    ) -> WorkerResult<Vec<MaintenanceWindow>>;
}
