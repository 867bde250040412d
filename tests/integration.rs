//! End-to-end scenarios against a real `SqliteStore`, driving the
//! evaluator/notifier/event-bus functions directly rather than the
//! scheduler's timers — the same approach the teacher's `tests/api_tests.rs`
//! takes for its own temp-db-per-test setup, generalized from a `Rocket
//! Client` harness (HTTP round-trips) to calling worker-plane functions
//! in-process, since there is no longer a CRUD HTTP surface to round-trip
//! through.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};

use watchpost_worker::alert_evaluator;
use watchpost_worker::config::WorkerConfig;
use watchpost_worker::db::Db;
use watchpost_worker::event_bus::EventBus;
use watchpost_worker::models::{
    AlertChannel, AlertRule, ChannelKind, IncidentFilter, IncidentStatus, MaintenanceWindow,
    Monitor, MonitorCheck, MonitorKind, Tenant, TriggerKind,
};
use watchpost_worker::notifier;
use watchpost_worker::store::sqlite::SqliteStore;
use watchpost_worker::store::Store;

fn open_store() -> (SqliteStore, tempfile::NamedTempFile) {
    let file = tempfile::NamedTempFile::new().expect("create temp db file");
    let db = Db::new(file.path().to_str().unwrap()).expect("open db");
    (SqliteStore::new(Arc::new(db)), file)
}

fn ts(base: chrono::DateTime<Utc>, secs: i64) -> String {
    (base + ChronoDuration::seconds(secs))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

async fn seed_tenant(store: &SqliteStore, id: &str) {
    store
        .create_tenant(Tenant {
            id: id.to_string(),
            name: "acme".to_string(),
            slug: id.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
        .await
        .unwrap();
}

fn sample_monitor(id: &str, tenant_id: &str, kind: MonitorKind, tags: Vec<String>) -> Monitor {
    Monitor {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        name: "example".to_string(),
        target: "http://example.test/".to_string(),
        kind,
        check_interval_seconds: 30,
        timeout_seconds: 5,
        enabled: true,
        body_keyword: None,
        expected_status_codes: vec![],
        ssl_check_enabled: kind == MonitorKind::Https,
        ssl_alert_days: None,
        last_checked_at: None,
        tags,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn sample_rule(id: &str, tenant_id: &str, monitor_id: &str, trigger: TriggerKind, threshold: i64) -> AlertRule {
    AlertRule {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        name: "rule".to_string(),
        monitor_id: Some(monitor_id.to_string()),
        trigger,
        threshold_value: threshold,
        enabled: true,
        created_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

fn check(monitor_id: &str, checked_at: &str, success: bool, response_time_ms: Option<u32>) -> MonitorCheck {
    MonitorCheck {
        id: String::new(),
        monitor_id: monitor_id.to_string(),
        checked_at: checked_at.to_string(),
        success,
        status_code: None,
        response_time_ms,
        ssl_valid: None,
        ssl_expires_at: None,
        error_message: None,
    }
}

#[tokio::test]
async fn s1_http_down_triggers_and_resolves_incident() {
    let (store, _guard) = open_store();
    seed_tenant(&store, "t1").await;
    let monitor = sample_monitor("m1", "t1", MonitorKind::Http, vec![]);
    store.create_monitor(monitor.clone()).await.unwrap();
    let rule = sample_rule("r1", "t1", "m1", TriggerKind::Down, 3);
    store.create_rule(rule).await.unwrap();

    let base = base_time();
    store.save_check(check("m1", &ts(base, 0), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 30), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 60), false, None)).await.unwrap();

    let bus = EventBus::new(16);
    let (created, resolved) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 60)).await;
    assert_eq!(created, 1);
    assert_eq!(resolved, 0);

    let open = store.get_open_incident("m1", "r1").await.unwrap().expect("incident open");
    assert!(open.trigger_value.contains("3 consecutive"));
    assert_eq!(open.status, IncidentStatus::Open);

    store.save_check(check("m1", &ts(base, 90), true, None)).await.unwrap();
    let (created, resolved) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 90)).await;
    assert_eq!(created, 0);
    assert_eq!(resolved, 1);

    let closed = store.get_open_incident("m1", "r1").await.unwrap();
    assert!(closed.is_none());
    let all = store
        .list_incidents(IncidentFilter {
            tenant_id: Some("t1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, IncidentStatus::Resolved);
}

#[tokio::test]
async fn s2_slow_response_triggers_and_resolves() {
    let (store, _guard) = open_store();
    seed_tenant(&store, "t1").await;
    let monitor = sample_monitor("m1", "t1", MonitorKind::Http, vec![]);
    store.create_monitor(monitor).await.unwrap();
    let rule = sample_rule("r1", "t1", "m1", TriggerKind::SlowResponse, 500);
    store.create_rule(rule).await.unwrap();

    let base = base_time();
    store
        .save_check(check("m1", &ts(base, 0), true, Some(750)))
        .await
        .unwrap();

    let bus = EventBus::new(16);
    let (created, _) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 0)).await;
    assert_eq!(created, 1);
    let open = store.get_open_incident("m1", "r1").await.unwrap().unwrap();
    assert_eq!(open.trigger_value, "response_time_ms=750 > 500");

    store
        .save_check(check("m1", &ts(base, 30), true, Some(200)))
        .await
        .unwrap();
    let (_, resolved) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 30)).await;
    assert_eq!(resolved, 1);
}

#[tokio::test]
async fn s3_ssl_expiry_triggers_and_resolves() {
    let (store, _guard) = open_store();
    seed_tenant(&store, "t1").await;
    let monitor = sample_monitor("m1", "t1", MonitorKind::Https, vec![]);
    store.create_monitor(monitor).await.unwrap();
    let rule = sample_rule("r1", "t1", "m1", TriggerKind::SslExpiry, 7);
    store.create_rule(rule).await.unwrap();

    let base = base_time();
    let mut expiring_soon = check("m1", &ts(base, 0), true, None);
    expiring_soon.ssl_valid = Some(true);
    expiring_soon.ssl_expires_at = Some(ts(base, 5 * 86_400));
    store.save_check(expiring_soon).await.unwrap();

    let bus = EventBus::new(16);
    let (created, _) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 0)).await;
    assert_eq!(created, 1);

    let mut far_off = check("m1", &ts(base, 60), true, None);
    far_off.ssl_valid = Some(true);
    far_off.ssl_expires_at = Some(ts(base, 30 * 86_400));
    store.save_check(far_off).await.unwrap();

    let (_, resolved) = alert_evaluator::evaluate_all(&store, &bus, &ts(base, 60)).await;
    assert_eq!(resolved, 1);
}

#[tokio::test]
async fn s4_notification_fan_out_and_idempotence() {
    let (store, _guard) = open_store();
    seed_tenant(&store, "t1").await;
    let monitor = sample_monitor("m1", "t1", MonitorKind::Http, vec![]);
    store.create_monitor(monitor).await.unwrap();
    let rule = sample_rule("r1", "t1", "m1", TriggerKind::Down, 1);
    store.create_rule(rule).await.unwrap();

    let webhook_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&webhook_server)
        .await;
    let discord_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&discord_server)
        .await;

    let webhook_channel = AlertChannel {
        id: "c-webhook".to_string(),
        tenant_id: "t1".to_string(),
        kind: ChannelKind::Webhook,
        name: "webhook".to_string(),
        enabled: true,
        config: serde_json::json!({ "url": webhook_server.uri() }),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    let discord_channel = AlertChannel {
        id: "c-discord".to_string(),
        tenant_id: "t1".to_string(),
        kind: ChannelKind::Discord,
        name: "discord".to_string(),
        enabled: true,
        config: serde_json::json!({ "webhook_url": discord_server.uri() }),
        created_at: "2026-01-01T00:00:00Z".to_string(),
    };
    store.create_channel(webhook_channel).await.unwrap();
    store.create_channel(discord_channel).await.unwrap();
    store
        .attach_channels("r1", &["c-webhook".to_string(), "c-discord".to_string()])
        .await
        .unwrap();

    let base = base_time();
    store.save_check(check("m1", &ts(base, 0), false, None)).await.unwrap();
    let bus = EventBus::new(16);
    alert_evaluator::evaluate_all(&store, &bus, &ts(base, 0)).await;

    let unnotified_before = store.get_unnotified_incidents(100).await.unwrap();
    assert_eq!(unnotified_before.len(), 1);

    let mut config = WorkerConfig::default();
    config.worker_retry_count = 0;
    let client = reqwest::Client::new();
    notifier::notify_tick(&store, &client, &config).await;

    let unnotified_after = store.get_unnotified_incidents(100).await.unwrap();
    assert!(unnotified_after.is_empty());

    assert_eq!(discord_server.received_requests().await.unwrap().len(), 1);
    assert_eq!(webhook_server.received_requests().await.unwrap().len(), 1);

    notifier::notify_tick(&store, &client, &config).await;
    assert_eq!(discord_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn s5_maintenance_window_suppresses_incident_until_it_ends() {
    let (store, _guard) = open_store();
    seed_tenant(&store, "t1").await;
    let monitor = sample_monitor("m1", "t1", MonitorKind::Http, vec!["db".to_string()]);
    store.create_monitor(monitor).await.unwrap();
    let rule = sample_rule("r1", "t1", "m1", TriggerKind::Down, 3);
    store.create_rule(rule).await.unwrap();

    let base = base_time();
    store
        .create_maintenance_window(MaintenanceWindow {
            id: "w1".to_string(),
            tenant_id: "t1".to_string(),
            name: "db maintenance".to_string(),
            start_time: ts(base, 0),
            end_time: ts(base, 3600),
            repeat_interval_seconds: 0,
            monitor_ids: vec![],
            tags: vec!["db".to_string()],
            created_at: ts(base, 0),
        })
        .await
        .unwrap();

    store.save_check(check("m1", &ts(base, 0), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 30), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 60), false, None)).await.unwrap();

    let bus = EventBus::new(16);
    let windows = store.maintenance_windows_for_tenant("t1").await.unwrap();
    assert_eq!(windows.len(), 1);

    // Evaluation during the window must not create an incident.
    let monitor = store.get_monitor("t1", "m1").await.unwrap();
    let during_window = ts(base, 65);
    assert!(watchpost_worker::maintenance::any_covers(&windows, &monitor, &during_window));
    let (created, _) = alert_evaluator::evaluate_all(&store, &bus, &during_window).await;
    assert_eq!(created, 0);
    assert!(store.get_open_incident("m1", "r1").await.unwrap().is_none());

    // After the window ends, a fresh failing streak opens one.
    store.save_check(check("m1", &ts(base, 3601), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 3631), false, None)).await.unwrap();
    store.save_check(check("m1", &ts(base, 3661), false, None)).await.unwrap();
    let after_window = ts(base, 3662);
    assert!(!watchpost_worker::maintenance::any_covers(&windows, &monitor, &after_window));
    let (created, _) = alert_evaluator::evaluate_all(&store, &bus, &after_window).await;
    assert_eq!(created, 1);
}

#[tokio::test]
async fn s6_event_bus_drops_oldest_under_sustained_publish_without_blocking() {
    let bus = EventBus::new(8);
    let sub = bus.subscribe("tenant-a");
    let _connected = sub.recv_batch().await;

    for _ in 0..100 {
        bus.publish(
            "tenant-a",
            watchpost_worker::models::Event::new(watchpost_worker::models::EventPayload::Connected),
        );
    }

    assert!(sub.dropped_count() >= 92);
    let remaining = sub.recv_batch().await;
    assert_eq!(remaining.len(), 8);
}
