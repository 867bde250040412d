use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::db::Db;
use crate::error::{WorkerError, WorkerResult};
use crate::models::{
    AlertChannel, AlertRule, ChannelKind, Incident, IncidentFilter, IncidentStatus,
    MaintenanceWindow, Monitor, MonitorCheck, MonitorKind, Tenant, TriggerKind, UnnotifiedIncident,
};

use super::Store;

/// The sole `Store` implementation, wrapping `crate::db::Db`'s
/// `Mutex<Connection>` the way the teacher's route handlers do —
/// `conn.lock().unwrap()` per call, no separate pool.
pub struct SqliteStore {
    db: Arc<Db>,
}

impl SqliteStore {
    pub fn new(db: Arc<Db>) -> Self {
        SqliteStore { db }
    }
}

fn join_csv(items: &[String]) -> String {
    items.join(",")
}

fn split_csv(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn row_to_monitor(row: &Row) -> rusqlite::Result<Monitor> {
    let kind_str: String = row.get("kind")?;
    let codes_str: String = row.get("expected_status_codes")?;
    let tags_str: String = row.get("tags")?;
    Ok(Monitor {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        target: row.get("target")?,
        kind: MonitorKind::from_str(&kind_str).unwrap_or(MonitorKind::Http),
        check_interval_seconds: row.get("check_interval_seconds")?,
        timeout_seconds: row.get("timeout_seconds")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        body_keyword: row.get("body_keyword")?,
        expected_status_codes: split_csv(&codes_str)
            .into_iter()
            .filter_map(|s| s.parse().ok())
            .collect(),
        ssl_check_enabled: row.get::<_, i64>("ssl_check_enabled")? != 0,
        ssl_alert_days: row.get("ssl_alert_days")?,
        last_checked_at: row.get("last_checked_at")?,
        tags: split_csv(&tags_str),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_check(row: &Row) -> rusqlite::Result<MonitorCheck> {
    Ok(MonitorCheck {
        id: row.get("id")?,
        monitor_id: row.get("monitor_id")?,
        checked_at: row.get("checked_at")?,
        success: row.get::<_, i64>("success")? != 0,
        status_code: row.get("status_code")?,
        response_time_ms: row.get("response_time_ms")?,
        ssl_valid: row
            .get::<_, Option<i64>>("ssl_valid")?
            .map(|v| v != 0),
        ssl_expires_at: row.get("ssl_expires_at")?,
        error_message: row.get("error_message")?,
    })
}

fn row_to_channel(row: &Row) -> rusqlite::Result<AlertChannel> {
    let kind_str: String = row.get("kind")?;
    let config_str: String = row.get("config")?;
    Ok(AlertChannel {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        kind: ChannelKind::from_str(&kind_str).unwrap_or(ChannelKind::Webhook),
        name: row.get("name")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        config: serde_json::from_str(&config_str).unwrap_or(serde_json::Value::Null),
        created_at: row.get("created_at")?,
    })
}

fn row_to_rule(row: &Row) -> rusqlite::Result<AlertRule> {
    let trigger_str: String = row.get("trigger")?;
    Ok(AlertRule {
        id: row.get("id")?,
        tenant_id: row.get("tenant_id")?,
        name: row.get("name")?,
        monitor_id: row.get("monitor_id")?,
        trigger: TriggerKind::from_str(&trigger_str).unwrap_or(TriggerKind::Down),
        threshold_value: row.get("threshold_value")?,
        enabled: row.get::<_, i64>("enabled")? != 0,
        created_at: row.get("created_at")?,
    })
}

fn row_to_incident(row: &Row) -> rusqlite::Result<Incident> {
    let status_str: String = row.get("status")?;
    Ok(Incident {
        id: row.get("id")?,
        monitor_id: row.get("monitor_id")?,
        alert_rule_id: row.get("alert_rule_id")?,
        started_at: row.get("started_at")?,
        resolved_at: row.get("resolved_at")?,
        status: if status_str == "resolved" {
            IncidentStatus::Resolved
        } else {
            IncidentStatus::Open
        },
        trigger_value: row.get("trigger_value")?,
        created_at: row.get("created_at")?,
        notified_at: row.get("notified_at")?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_tenant(&self, tenant: Tenant) -> WorkerResult<Tenant> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO tenants (id, name, slug, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![tenant.id, tenant.name, tenant.slug, tenant.created_at],
        )?;
        Ok(tenant)
    }

    async fn get_tenant(&self, id: &str) -> WorkerResult<Tenant> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT id, name, slug, created_at FROM tenants WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tenant {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    slug: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .map_err(WorkerError::from)
    }

    async fn create_monitor(&self, monitor: Monitor) -> WorkerResult<Monitor> {
        monitor
            .validate()
            .map_err(WorkerError::ValidationError)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO monitors (id, tenant_id, name, target, kind, check_interval_seconds,
                timeout_seconds, enabled, body_keyword, expected_status_codes, ssl_check_enabled,
                ssl_alert_days, last_checked_at, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                monitor.id,
                monitor.tenant_id,
                monitor.name,
                monitor.target,
                monitor.kind.as_str(),
                monitor.check_interval_seconds,
                monitor.timeout_seconds,
                monitor.enabled as i64,
                monitor.body_keyword,
                join_csv(
                    &monitor
                        .expected_status_codes
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                ),
                monitor.ssl_check_enabled as i64,
                monitor.ssl_alert_days,
                monitor.last_checked_at,
                join_csv(&monitor.tags),
                monitor.created_at,
                monitor.updated_at,
            ],
        )?;
        Ok(monitor)
    }

    async fn get_monitor(&self, tenant_id: &str, id: &str) -> WorkerResult<Monitor> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM monitors WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
            row_to_monitor,
        )
        .map_err(WorkerError::from)
    }

    async fn update_monitor(&self, monitor: Monitor) -> WorkerResult<Monitor> {
        monitor
            .validate()
            .map_err(WorkerError::ValidationError)?;
        let conn = self.db.conn();
        let updated_at = crate::models::now_iso();
        let affected = conn.execute(
            "UPDATE monitors SET name = ?1, target = ?2, kind = ?3, check_interval_seconds = ?4,
                timeout_seconds = ?5, enabled = ?6, body_keyword = ?7, expected_status_codes = ?8,
                ssl_check_enabled = ?9, ssl_alert_days = ?10, tags = ?11, updated_at = ?12
             WHERE id = ?13 AND tenant_id = ?14",
            params![
                monitor.name,
                monitor.target,
                monitor.kind.as_str(),
                monitor.check_interval_seconds,
                monitor.timeout_seconds,
                monitor.enabled as i64,
                monitor.body_keyword,
                join_csv(
                    &monitor
                        .expected_status_codes
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                ),
                monitor.ssl_check_enabled as i64,
                monitor.ssl_alert_days,
                join_csv(&monitor.tags),
                updated_at,
                monitor.id,
                monitor.tenant_id,
            ],
        )?;
        drop(conn);
        if affected == 0 {
            return Err(WorkerError::NotFound(format!("monitor {}", monitor.id)));
        }
        self.get_monitor(&monitor.tenant_id, &monitor.id).await
    }

    async fn delete_monitor(&self, tenant_id: &str, id: &str) -> WorkerResult<()> {
        let conn = self.db.conn();
        let affected = conn.execute(
            "DELETE FROM monitors WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
        )?;
        if affected == 0 {
            return Err(WorkerError::NotFound(format!("monitor {}", id)));
        }
        Ok(())
    }

    async fn get_monitors_needing_check(&self, now: &str) -> WorkerResult<Vec<Monitor>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM monitors
             WHERE enabled = 1
               AND (last_checked_at IS NULL
                    OR datetime(last_checked_at, '+' || check_interval_seconds || ' seconds') <= datetime(?1))
             ORDER BY last_checked_at IS NOT NULL, last_checked_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![now], row_to_monitor)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn get_monitors_needing_ssl_check(&self) -> WorkerResult<Vec<Monitor>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM monitors WHERE enabled = 1 AND ssl_check_enabled = 1 AND kind = 'https' ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_monitor)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn save_check(&self, mut check: MonitorCheck) -> WorkerResult<MonitorCheck> {
        if check.id.is_empty() {
            check.id = uuid::Uuid::new_v4().to_string();
        }
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO monitor_checks (id, monitor_id, checked_at, success, status_code,
                response_time_ms, ssl_valid, ssl_expires_at, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                check.id,
                check.monitor_id,
                check.checked_at,
                check.success as i64,
                check.status_code,
                check.response_time_ms,
                check.ssl_valid.map(|v| v as i64),
                check.ssl_expires_at,
                check.error_message,
            ],
        )?;
        Ok(check)
    }

    async fn update_last_checked_at(&self, monitor_id: &str, t: &str) -> WorkerResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE monitors SET last_checked_at = ?1 WHERE id = ?2",
            params![t, monitor_id],
        )?;
        Ok(())
    }

    async fn recent_checks(&self, monitor_id: &str, limit: u32) -> WorkerResult<Vec<MonitorCheck>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM monitor_checks WHERE monitor_id = ?1 ORDER BY checked_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![monitor_id, limit], row_to_check)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn latest_ssl_check(&self, monitor_id: &str) -> WorkerResult<Option<MonitorCheck>> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM monitor_checks WHERE monitor_id = ?1 AND ssl_expires_at IS NOT NULL
             ORDER BY checked_at DESC LIMIT 1",
            params![monitor_id],
            row_to_check,
        )
        .optional()
        .map_err(WorkerError::from)
    }

    async fn create_channel(&self, channel: AlertChannel) -> WorkerResult<AlertChannel> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO alert_channels (id, tenant_id, kind, name, enabled, config, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                channel.id,
                channel.tenant_id,
                channel.kind.as_str(),
                channel.name,
                channel.enabled as i64,
                serde_json::to_string(&channel.config).unwrap_or_else(|_| "{}".to_string()),
                channel.created_at,
            ],
        )?;
        Ok(channel)
    }

    async fn get_channel(&self, tenant_id: &str, id: &str) -> WorkerResult<AlertChannel> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM alert_channels WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
            row_to_channel,
        )
        .map_err(WorkerError::from)
    }

    async fn delete_channel(&self, tenant_id: &str, id: &str) -> WorkerResult<()> {
        let conn = self.db.conn();
        let affected = conn.execute(
            "DELETE FROM alert_channels WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
        )?;
        if affected == 0 {
            return Err(WorkerError::NotFound(format!("channel {}", id)));
        }
        Ok(())
    }

    async fn create_rule(&self, rule: AlertRule) -> WorkerResult<AlertRule> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO alert_rules (id, tenant_id, name, monitor_id, trigger, threshold_value, enabled, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rule.id,
                rule.tenant_id,
                rule.name,
                rule.monitor_id,
                rule.trigger.as_str(),
                rule.threshold_value,
                rule.enabled as i64,
                rule.created_at,
            ],
        )?;
        Ok(rule)
    }

    async fn get_rule(&self, tenant_id: &str, id: &str) -> WorkerResult<AlertRule> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM alert_rules WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
            row_to_rule,
        )
        .map_err(WorkerError::from)
    }

    async fn delete_rule(&self, tenant_id: &str, id: &str) -> WorkerResult<()> {
        let conn = self.db.conn();
        let affected = conn.execute(
            "DELETE FROM alert_rules WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
        )?;
        if affected == 0 {
            return Err(WorkerError::NotFound(format!("rule {}", id)));
        }
        Ok(())
    }

    async fn all_enabled_rules(&self) -> WorkerResult<Vec<AlertRule>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT * FROM alert_rules WHERE enabled = 1 ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], row_to_rule)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn monitors_for_rule(&self, rule: &AlertRule) -> WorkerResult<Vec<Monitor>> {
        let conn = self.db.conn();
        if let Some(ref monitor_id) = rule.monitor_id {
            let mut stmt =
                conn.prepare("SELECT * FROM monitors WHERE id = ?1 AND enabled = 1")?;
            let rows = stmt
                .query_map(params![monitor_id], row_to_monitor)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        } else {
            let mut stmt = conn.prepare(
                "SELECT * FROM monitors WHERE tenant_id = ?1 AND enabled = 1 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(params![rule.tenant_id], row_to_monitor)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        }
    }

    async fn channels_for_rule(&self, rule_id: &str) -> WorkerResult<Vec<AlertChannel>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT c.* FROM alert_channels c
             JOIN rule_channel_attachments a ON a.channel_id = c.id
             WHERE a.rule_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![rule_id], row_to_channel)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn attach_channels(&self, rule_id: &str, channel_ids: &[String]) -> WorkerResult<()> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        for channel_id in channel_ids {
            tx.execute(
                "INSERT OR IGNORE INTO rule_channel_attachments (rule_id, channel_id) VALUES (?1, ?2)",
                params![rule_id, channel_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn detach_channels(&self, rule_id: &str, channel_ids: &[String]) -> WorkerResult<()> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        for channel_id in channel_ids {
            tx.execute(
                "DELETE FROM rule_channel_attachments WHERE rule_id = ?1 AND channel_id = ?2",
                params![rule_id, channel_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_open_incident(
        &self,
        monitor_id: &str,
        rule_id: &str,
    ) -> WorkerResult<Option<Incident>> {
        let conn = self.db.conn();
        conn.query_row(
            "SELECT * FROM incidents WHERE monitor_id = ?1 AND alert_rule_id = ?2 AND status = 'open'",
            params![monitor_id, rule_id],
            row_to_incident,
        )
        .optional()
        .map_err(WorkerError::from)
    }

    async fn create_incident(&self, incident: Incident) -> WorkerResult<Incident> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO incidents (id, monitor_id, alert_rule_id, started_at, resolved_at, status,
                trigger_value, created_at, notified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                incident.id,
                incident.monitor_id,
                incident.alert_rule_id,
                incident.started_at,
                incident.resolved_at,
                incident.status.as_str(),
                incident.trigger_value,
                incident.created_at,
                incident.notified_at,
            ],
        )?;
        Ok(incident)
    }

    async fn resolve_incident(&self, incident_id: &str) -> WorkerResult<Incident> {
        let conn = self.db.conn();
        let now = crate::models::now_iso();
        conn.execute(
            "UPDATE incidents SET status = 'resolved', resolved_at = ?1
             WHERE id = ?2 AND status = 'open'",
            params![now, incident_id],
        )?;
        conn.query_row(
            "SELECT * FROM incidents WHERE id = ?1",
            params![incident_id],
            row_to_incident,
        )
        .map_err(WorkerError::from)
    }

    async fn list_incidents(&self, filter: IncidentFilter) -> WorkerResult<Vec<Incident>> {
        let conn = self.db.conn();
        let mut sql = String::from(
            "SELECT i.* FROM incidents i JOIN monitors m ON m.id = i.monitor_id WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref tenant_id) = filter.tenant_id {
            sql.push_str(" AND m.tenant_id = ?");
            args.push(Box::new(tenant_id.clone()));
        }
        if let Some(ref monitor_id) = filter.monitor_id {
            sql.push_str(" AND i.monitor_id = ?");
            args.push(Box::new(monitor_id.clone()));
        }
        if let Some(ref status) = filter.status {
            sql.push_str(" AND i.status = ?");
            args.push(Box::new(status.as_str().to_string()));
        }
        if let Some(ref from) = filter.from {
            sql.push_str(" AND i.started_at >= ?");
            args.push(Box::new(from.clone()));
        }
        if let Some(ref to) = filter.to {
            sql.push_str(" AND i.started_at <= ?");
            args.push(Box::new(to.clone()));
        }
        sql.push_str(" ORDER BY i.started_at DESC LIMIT ? OFFSET ?");
        let limit = if filter.limit == 0 { 50 } else { filter.limit };
        args.push(Box::new(limit));
        args.push(Box::new(filter.offset));

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_incident)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn get_unnotified_incidents(&self, limit: u32) -> WorkerResult<Vec<UnnotifiedIncident>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT i.*, m.id as m_id, m.name as m_name, m.target as m_target,
                    r.name as r_name, r.trigger as r_trigger
             FROM incidents i
             JOIN monitors m ON m.id = i.monitor_id
             JOIN alert_rules r ON r.id = i.alert_rule_id
             WHERE i.notified_at IS NULL
             ORDER BY i.created_at ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let incident = row_to_incident(row)?;
                let trigger_str: String = row.get("r_trigger")?;
                Ok(UnnotifiedIncident {
                    incident,
                    monitor_id: row.get("m_id")?,
                    monitor_name: row.get("m_name")?,
                    monitor_target: row.get("m_target")?,
                    rule_name: row.get("r_name")?,
                    trigger: TriggerKind::from_str(&trigger_str).unwrap_or(TriggerKind::Down),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    async fn mark_as_notified(&self, incident_id: &str) -> WorkerResult<bool> {
        let conn = self.db.conn();
        let now = crate::models::now_iso();
        let affected = conn.execute(
            "UPDATE incidents SET notified_at = ?1 WHERE id = ?2 AND notified_at IS NULL",
            params![now, incident_id],
        )?;
        Ok(affected > 0)
    }

    async fn create_maintenance_window(
        &self,
        window: MaintenanceWindow,
    ) -> WorkerResult<MaintenanceWindow> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO maintenance_windows (id, tenant_id, name, start_time, end_time, repeat_interval_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                window.id,
                window.tenant_id,
                window.name,
                window.start_time,
                window.end_time,
                window.repeat_interval_seconds as i64,
                window.created_at,
            ],
        )?;
        for monitor_id in &window.monitor_ids {
            tx.execute(
                "INSERT OR IGNORE INTO maintenance_window_monitors (window_id, monitor_id) VALUES (?1, ?2)",
                params![window.id, monitor_id],
            )?;
        }
        for tag in &window.tags {
            tx.execute(
                "INSERT OR IGNORE INTO maintenance_window_tags (window_id, tag) VALUES (?1, ?2)",
                params![window.id, tag],
            )?;
        }
        tx.commit()?;
        Ok(window)
    }

    async fn delete_maintenance_window(&self, tenant_id: &str, id: &str) -> WorkerResult<()> {
        let conn = self.db.conn();
        let affected = conn.execute(
            "DELETE FROM maintenance_windows WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant_id],
        )?;
        if affected == 0 {
            return Err(WorkerError::NotFound(format!("maintenance window {}", id)));
        }
        Ok(())
    }

    async fn maintenance_windows_for_tenant(
        &self,
        tenant_id: &str,
    ) -> WorkerResult<Vec<MaintenanceWindow>> {
        let conn = self.db.conn();
        let mut stmt =
            conn.prepare("SELECT * FROM maintenance_windows WHERE tenant_id = ?1")?;
        let mut windows: Vec<MaintenanceWindow> = stmt
            .query_map(params![tenant_id], |row| {
                Ok(MaintenanceWindow {
                    id: row.get("id")?,
                    tenant_id: row.get("tenant_id")?,
                    name: row.get("name")?,
                    start_time: row.get("start_time")?,
                    end_time: row.get("end_time")?,
                    repeat_interval_seconds: row.get::<_, i64>("repeat_interval_seconds")? as u64,
                    monitor_ids: Vec::new(),
                    tags: Vec::new(),
                    created_at: row.get("created_at")?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        for window in windows.iter_mut() {
            let mut mstmt = conn
                .prepare("SELECT monitor_id FROM maintenance_window_monitors WHERE window_id = ?1")?;
            window.monitor_ids = mstmt
                .query_map(params![window.id], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();

            let mut tstmt =
                conn.prepare("SELECT tag FROM maintenance_window_tags WHERE window_id = ?1")?;
            window.tags = tstmt
                .query_map(params![window.id], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
        }
        Ok(windows)
    }
}
