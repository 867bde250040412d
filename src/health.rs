//! Liveness/readiness HTTP surface (`SPEC_FULL.md` §6), grounded on the
//! teacher's `routes::system::health` (a single flat `{service, status,
//! version}` document) and generalized into the liveness/readiness split a
//! long-running worker process needs: liveness answers "is the process
//! alive", readiness answers "can it actually do its job right now".

use rocket::serde::json::Json;
use rocket::{get, State};
use serde::Serialize;

use crate::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// The scheduler's four named jobs, in the order `spec.md` §4.3 lists them.
pub const JOB_NAMES: [&str; 4] = ["health-check", "ssl-check", "alert-evaluate", "notify"];

/// Flipped to `false` once the scheduler has begun its shutdown sequence,
/// so `/health/ready` stops advertising readiness during drain. Also tracks
/// each job's last-completed-tick timestamp for the readiness payload's
/// `jobs` array (`spec.md` §6).
pub struct SchedulerStatus {
    running: AtomicBool,
    last_run_unix: [AtomicI64; JOB_NAMES.len()],
}

impl SchedulerStatus {
    pub fn running() -> Self {
        SchedulerStatus {
            running: AtomicBool::new(true),
            last_run_unix: Default::default(),
        }
    }

    pub fn mark_stopped(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Records that `job` (one of `JOB_NAMES`) just completed a tick.
    pub fn record_tick(&self, job: &str) {
        if let Some(idx) = JOB_NAMES.iter().position(|&n| n == job) {
            self.last_run_unix[idx].store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
        }
    }

    fn jobs(&self) -> Vec<JobStatus> {
        JOB_NAMES
            .iter()
            .enumerate()
            .map(|(idx, &name)| {
                let last = self.last_run_unix[idx].load(Ordering::Relaxed);
                JobStatus {
                    name,
                    last_run_at: if last == 0 {
                        None
                    } else {
                        chrono::DateTime::from_timestamp(last, 0)
                            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                    },
                }
            })
            .collect()
    }
}

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    service: &'static str,
}

#[get("/health/live")]
pub fn live() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        service: "worker",
    })
}

#[derive(Serialize)]
struct JobStatus {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_run_at: Option<String>,
}

#[derive(Serialize)]
struct Readiness {
    ready: bool,
    database: &'static str,
    scheduler: &'static str,
    jobs: Vec<JobStatus>,
}

/// Readiness means: the scheduler hasn't begun shutdown, and the store can
/// still answer a cheap cross-tenant read.
#[get("/health/ready")]
pub async fn ready(
    store: &State<Arc<dyn Store>>,
    scheduler: &State<Arc<SchedulerStatus>>,
) -> Json<Readiness> {
    let scheduler_running = scheduler.is_running();
    let database_ok = store.get_monitors_needing_ssl_check().await.is_ok();

    Json(Readiness {
        ready: scheduler_running && database_ok,
        database: if database_ok { "connected" } else { "disconnected" },
        scheduler: if scheduler_running { "running" } else { "stopped" },
        jobs: scheduler.jobs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_status_starts_running_and_can_be_stopped() {
        let status = SchedulerStatus::running();
        assert!(status.is_running());
        status.mark_stopped();
        assert!(!status.is_running());
    }

    #[test]
    fn jobs_start_unrun_and_record_tick_populates_last_run_at() {
        let status = SchedulerStatus::running();
        let jobs = status.jobs();
        assert_eq!(jobs.len(), JOB_NAMES.len());
        assert!(jobs.iter().all(|j| j.last_run_at.is_none()));

        status.record_tick("alert-evaluate");
        let jobs = status.jobs();
        let eval = jobs.iter().find(|j| j.name == "alert-evaluate").unwrap();
        assert!(eval.last_run_at.is_some());
        assert!(jobs.iter().filter(|j| j.name != "alert-evaluate").all(|j| j.last_run_at.is_none()));
    }
}
