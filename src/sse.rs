//! Real-time event-stream route (`SPEC_FULL.md` §6 / `spec.md` §4.7).
//!
//! Generalizes the teacher's `EventBroadcaster` (one global
//! `tokio::sync::broadcast`, tenant-blind, with an explicit "lagged" skip
//! event) into a per-tenant stream backed by `crate::event_bus::EventBus`.
//! The ring already drops oldest-on-full per subscriber, so there is no
//! lag-counting branch to replicate here — a client that falls behind just
//! gets fewer, newer events, which `EventBus::publish`'s own test coverage
//! already exercises.

use rocket::response::stream::{Event, EventStream};
use rocket::{get, State};

use crate::event_bus::EventBus;

/// `GET /events/<tenant_id>` — a live SSE feed of `monitor_check`,
/// `incident_created`, and `incident_resolved` events for one tenant.
/// The stream opens with a synthetic `connected` event (`EventBus::
/// subscribe`'s own behavior) so clients can confirm the connection before
/// any real activity occurs.
#[get("/events/<tenant_id>")]
pub fn tenant_stream(tenant_id: String, bus: &State<EventBus>) -> EventStream![Event + '_] {
    let subscription = bus.subscribe(&tenant_id);
    EventStream! {
        loop {
            let batch = subscription.recv_batch().await;
            for event in batch {
                let kind = event.kind;
                let data = serde_json::to_string(&event).unwrap_or_default();
                yield Event::data(data).event(kind);
            }
        }
    }
}
