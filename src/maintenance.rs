//! Maintenance window coverage.
//!
//! Generalizes the teacher's `routes::maintenance::{is_in_maintenance,
//! is_time_in_window}` — a single non-recurring window compared by string
//! equality — into the recurring-window arithmetic `spec.md` §3 requires.

use chrono::{DateTime, Utc};

use crate::models::{MaintenanceWindow, Monitor};

/// Returns whether `window` covers `monitor` at instant `at` (an ISO-8601
/// timestamp in the same format as every other timestamp in this crate).
///
/// A window covers a monitor at `T` when `T` lies inside
/// `[start_time + k*repeat_interval, end_time + k*repeat_interval]` for
/// some integer `k >= 0`, and either `monitor_ids` is empty, contains the
/// monitor, or any of the monitor's tags matches one of the window's tags.
pub fn covers(window: &MaintenanceWindow, monitor: &Monitor, at: &str) -> bool {
    if !applies_to_monitor(window, monitor) {
        return false;
    }

    let (Some(at), Some(start), Some(end)) = (parse(at), parse(&window.start_time), parse(&window.end_time))
    else {
        return false;
    };
    if end < start {
        return false;
    }

    let duration = end - start;
    if window.repeat_interval_seconds == 0 {
        return at >= start && at <= end;
    }

    let interval = chrono::Duration::seconds(window.repeat_interval_seconds as i64);
    if interval.num_seconds() <= 0 {
        return at >= start && at <= end;
    }

    // Find the largest k such that start + k*interval <= at, then check
    // at falls within that occurrence's [start, end] span.
    let elapsed = at - start;
    if elapsed.num_seconds() < 0 {
        return false;
    }
    let k = elapsed.num_seconds() / interval.num_seconds();
    let occurrence_start = start + chrono::Duration::seconds(interval.num_seconds() * k);
    let occurrence_end = occurrence_start + duration;
    at >= occurrence_start && at <= occurrence_end
}

fn applies_to_monitor(window: &MaintenanceWindow, monitor: &Monitor) -> bool {
    if window.monitor_ids.is_empty() {
        return true;
    }
    if window.monitor_ids.iter().any(|id| id == &monitor.id) {
        return true;
    }
    monitor.tags.iter().any(|tag| window.tags.contains(tag))
}

fn parse(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%SZ")
                .ok()
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        })
}

/// Whether any window in `windows` covers `monitor` at `at`.
pub fn any_covers(windows: &[MaintenanceWindow], monitor: &Monitor, at: &str) -> bool {
    windows.iter().any(|w| covers(w, monitor, at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(id: &str, tags: Vec<String>) -> Monitor {
        Monitor {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            name: "m".to_string(),
            target: "http://example.com".to_string(),
            kind: crate::models::MonitorKind::Http,
            check_interval_seconds: 60,
            timeout_seconds: 5,
            enabled: true,
            body_keyword: None,
            expected_status_codes: vec![],
            ssl_check_enabled: false,
            ssl_alert_days: None,
            last_checked_at: None,
            tags,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn window(start: &str, end: &str, repeat: u64, monitor_ids: Vec<String>, tags: Vec<String>) -> MaintenanceWindow {
        MaintenanceWindow {
            id: "w1".to_string(),
            tenant_id: "t1".to_string(),
            name: "maint".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            repeat_interval_seconds: repeat,
            monitor_ids,
            tags,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn one_shot_window_covers_instant_inside_range() {
        let w = window("2026-01-01T00:00:00Z", "2026-01-01T02:00:00Z", 0, vec![], vec![]);
        let m = monitor("m1", vec![]);
        assert!(covers(&w, &m, "2026-01-01T01:00:00Z"));
        assert!(!covers(&w, &m, "2026-01-01T03:00:00Z"));
    }

    #[test]
    fn recurring_window_covers_later_occurrence() {
        // daily 1-hour window starting at midnight, repeating every 24h
        let w = window(
            "2026-01-01T00:00:00Z",
            "2026-01-01T01:00:00Z",
            24 * 3600,
            vec![],
            vec![],
        );
        let m = monitor("m1", vec![]);
        // three days later, inside the recurrence
        assert!(covers(&w, &m, "2026-01-04T00:30:00Z"));
        // three days later, outside the 1-hour window
        assert!(!covers(&w, &m, "2026-01-04T02:00:00Z"));
    }

    #[test]
    fn monitor_id_scoping_excludes_other_monitors() {
        let w = window(
            "2026-01-01T00:00:00Z",
            "2026-01-01T02:00:00Z",
            0,
            vec!["m1".to_string()],
            vec![],
        );
        let covered = monitor("m1", vec![]);
        let other = monitor("m2", vec![]);
        assert!(covers(&w, &covered, "2026-01-01T01:00:00Z"));
        assert!(!covers(&w, &other, "2026-01-01T01:00:00Z"));
    }

    #[test]
    fn tag_matching_includes_monitor_without_explicit_id() {
        let w = window(
            "2026-01-01T00:00:00Z",
            "2026-01-01T02:00:00Z",
            0,
            vec!["m99".to_string()],
            vec!["prod".to_string()],
        );
        let tagged = monitor("m1", vec!["prod".to_string()]);
        assert!(covers(&w, &tagged, "2026-01-01T01:00:00Z"));
    }
}
