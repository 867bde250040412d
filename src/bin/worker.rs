//! Worker process entry point: one scheduler, one small HTTP surface
//! (liveness/readiness plus the real-time event stream) sharing a process.
//!
//! Generalizes the teacher's `main.rs` (`#[launch] fn rocket() -> _`
//! plus an `AdHoc::on_liftoff` fairing spawning `checker::run_checker`)
//! into a plain `#[tokio::main]`: the scheduler is spawned before
//! `rocket.launch().await`, which already blocks until Rocket's own
//! graceful shutdown (ctrl-c/SIGTERM, on by default) completes, so the
//! fairing indirection buys nothing here and only complicates ownership.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::error;

use watchpost_worker::config::WorkerConfig;
use watchpost_worker::db::Db;
use watchpost_worker::event_bus::EventBus;
use watchpost_worker::health::{self, SchedulerStatus};
use watchpost_worker::probe::http::build_client;
use watchpost_worker::scheduler::Scheduler;
use watchpost_worker::sse;
use watchpost_worker::store::sqlite::SqliteStore;
use watchpost_worker::store::Store;
use watchpost_worker::worker_pool::WorkerPool;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = WorkerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "invalid worker configuration");
        std::process::exit(1);
    }

    let db = match Db::new(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(db));

    let bus = EventBus::new(config.event_queue_capacity);
    let pool = WorkerPool::new(&config);
    let http_client = match build_client() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build shared http client");
            std::process::exit(1);
        }
    };

    let scheduler_status = Arc::new(SchedulerStatus::running());
    let scheduler = Scheduler::new(
        store.clone(),
        bus.clone(),
        pool,
        http_client,
        config.clone(),
        scheduler_status.clone(),
    );

    let cancel = CancellationToken::new();
    let scheduler_cancel = cancel.clone();
    let scheduler_status_for_task = scheduler_status.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_cancel).await;
        scheduler_status_for_task.mark_stopped();
    });

    let figment = rocket::Config::figment()
        .merge(("address", config.bind_addr.clone()))
        .merge(("port", config.bind_port));

    let launch_result = rocket::custom(figment)
        .manage(store)
        .manage(bus)
        .manage(scheduler_status)
        .mount(
            "/",
            rocket::routes![health::live, health::ready, sse::tenant_stream],
        )
        .launch()
        .await;

    if let Err(e) = launch_result {
        error!(error = %e, "rocket server exited with error");
    }

    cancel.cancel();
    let _ = scheduler_handle.await;
}
