use rusqlite::{Connection, Result};
use std::sync::Mutex;

/// Owns the single SQLite connection behind a mutex, exactly as the teacher
/// does — the worker plane's write volume is low enough (one check per
/// monitor per interval) that a connection pool would add complexity with
/// no throughput benefit.
pub struct Db {
    pub conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
        )?;
        let db = Db {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS monitors (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                target TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'http',
                check_interval_seconds INTEGER NOT NULL DEFAULT 60,
                timeout_seconds INTEGER NOT NULL DEFAULT 10,
                enabled INTEGER NOT NULL DEFAULT 1,
                body_keyword TEXT,
                expected_status_codes TEXT NOT NULL DEFAULT '',
                ssl_check_enabled INTEGER NOT NULL DEFAULT 0,
                ssl_alert_days INTEGER,
                last_checked_at TEXT,
                tags TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_monitors_tenant ON monitors(tenant_id);
            CREATE INDEX IF NOT EXISTS idx_monitors_due ON monitors(enabled, last_checked_at);

            CREATE TABLE IF NOT EXISTS monitor_checks (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
                checked_at TEXT NOT NULL DEFAULT (datetime('now')),
                success INTEGER NOT NULL,
                status_code INTEGER,
                response_time_ms INTEGER,
                ssl_valid INTEGER,
                ssl_expires_at TEXT,
                error_message TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_checks_monitor ON monitor_checks(monitor_id, checked_at DESC);

            CREATE TABLE IF NOT EXISTS alert_channels (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                config TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_channels_tenant ON alert_channels(tenant_id);

            CREATE TABLE IF NOT EXISTS alert_rules (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                monitor_id TEXT REFERENCES monitors(id) ON DELETE CASCADE,
                trigger TEXT NOT NULL,
                threshold_value INTEGER NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_rules_tenant ON alert_rules(tenant_id, enabled);
            CREATE INDEX IF NOT EXISTS idx_rules_monitor ON alert_rules(monitor_id);

            CREATE TABLE IF NOT EXISTS rule_channel_attachments (
                rule_id TEXT NOT NULL REFERENCES alert_rules(id) ON DELETE CASCADE,
                channel_id TEXT NOT NULL REFERENCES alert_channels(id) ON DELETE CASCADE,
                PRIMARY KEY (rule_id, channel_id)
            );

            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
                alert_rule_id TEXT NOT NULL REFERENCES alert_rules(id) ON DELETE CASCADE,
                started_at TEXT NOT NULL DEFAULT (datetime('now')),
                resolved_at TEXT,
                status TEXT NOT NULL DEFAULT 'open',
                trigger_value TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                notified_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_monitor ON incidents(monitor_id, started_at DESC);
            CREATE INDEX IF NOT EXISTS idx_incidents_open ON incidents(monitor_id, alert_rule_id, status);
            CREATE INDEX IF NOT EXISTS idx_incidents_unnotified ON incidents(notified_at, created_at);

            CREATE TABLE IF NOT EXISTS maintenance_windows (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                repeat_interval_seconds INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_maintenance_tenant ON maintenance_windows(tenant_id);

            CREATE TABLE IF NOT EXISTS maintenance_window_monitors (
                window_id TEXT NOT NULL REFERENCES maintenance_windows(id) ON DELETE CASCADE,
                monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
                PRIMARY KEY (window_id, monitor_id)
            );

            CREATE TABLE IF NOT EXISTS maintenance_window_tags (
                window_id TEXT NOT NULL REFERENCES maintenance_windows(id) ON DELETE CASCADE,
                tag TEXT NOT NULL,
                PRIMARY KEY (window_id, tag)
            );
            ",
        )?;

        Ok(())
    }
}
