//! Environment-derived worker configuration.
//!
//! Loaded once at process start via `dotenvy` (the teacher's own mechanism
//! for reading a `.env` file in development) plus `std::env`, with typed
//! defaults matching the keys and defaults named for the scheduler.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_count: usize,
    pub worker_retry_count: u32,
    pub worker_retry_delay: Duration,
    pub health_check_period: Duration,
    pub ssl_check_period: Duration,
    pub alert_eval_period: Duration,
    pub notify_period: Duration,
    pub event_queue_capacity: usize,
    pub database_path: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
}

fn env_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        WorkerConfig {
            worker_count: env_var("WORKER_COUNT", 5),
            worker_retry_count: env_var("WORKER_RETRY_COUNT", 3),
            worker_retry_delay: Duration::from_millis(env_var("WORKER_RETRY_DELAY_MS", 2000)),
            health_check_period: Duration::from_secs(env_var("HEALTH_CHECK_PERIOD_S", 30)),
            ssl_check_period: Duration::from_secs(env_var("SSL_CHECK_PERIOD_S", 300)),
            alert_eval_period: Duration::from_secs(env_var("ALERT_EVAL_PERIOD_S", 60)),
            notify_period: Duration::from_secs(env_var("NOTIFY_PERIOD_S", 30)),
            event_queue_capacity: env_var("EVENT_QUEUE_CAPACITY", 64),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./watchpost-worker.db".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            bind_port: env_var("BIND_PORT", 8100),
            smtp_host: env_string_opt("SMTP_HOST"),
            smtp_port: env_var("SMTP_PORT", 587),
            smtp_username: env_string_opt("SMTP_USERNAME"),
            smtp_password: env_string_opt("SMTP_PASSWORD"),
            smtp_from: env_string_opt("SMTP_FROM"),
        }
    }

    /// Sanity-check values that would otherwise fail silently or loop forever.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("WORKER_COUNT must be at least 1".to_string());
        }
        if self.event_queue_capacity == 0 {
            return Err("EVENT_QUEUE_CAPACITY must be at least 1".to_string());
        }
        if self.health_check_period.is_zero()
            || self.ssl_check_period.is_zero()
            || self.alert_eval_period.is_zero()
            || self.notify_period.is_zero()
        {
            return Err("scheduler periods must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
