//! Per-tenant partitioned pub/sub for the real-time event stream.
//!
//! Replaces the teacher's single global `tokio::sync::broadcast` channel
//! (`src/sse.rs`) with a `dashmap`-partitioned map of tenant -> subscriber
//! list, grounded on `other_examples/ifpj-netwatch`'s `DashMap`-keyed state
//! pattern. Each subscriber owns a bounded ring buffer
//! (`Mutex<VecDeque<Event>>` + `Notify`) with drop-oldest-on-full semantics,
//! since `tokio::sync::mpsc`'s native behavior (reject-on-full) does not
//! match §4.7/§8 property 7's requirement.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::warn;

use crate::models::{Event, EventPayload};

struct Ring {
    queue: std::sync::Mutex<VecDeque<Event>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Ring {
            queue: std::sync::Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, event: Event) {
        let mut queue = self.queue.lock().expect("ring mutex poisoned");
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_waiters();
    }

    fn drain(&self) -> Vec<Event> {
        let mut queue = self.queue.lock().expect("ring mutex poisoned");
        queue.drain(..).collect()
    }
}

/// A handle to one connected real-time client. Drop to unsubscribe.
pub struct Subscription {
    tenant_id: String,
    id: u64,
    ring: Arc<Ring>,
    bus: Arc<EventBusInner>,
}

impl Subscription {
    /// Waits for at least one queued event, then returns every event
    /// currently queued (oldest first).
    pub async fn recv_batch(&self) -> Vec<Event> {
        loop {
            let notified = self.ring.notify.notified();
            let batch = self.ring.drain();
            if !batch.is_empty() {
                return batch;
            }
            notified.await;
        }
    }

    /// Number of events dropped for this subscriber due to a full queue.
    pub fn dropped_count(&self) -> u64 {
        self.ring.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.tenant_id, self.id);
    }
}

struct EventBusInner {
    capacity: usize,
    tenants: DashMap<String, DashMap<u64, Arc<Ring>>>,
    next_id: AtomicU64,
}

impl EventBusInner {
    fn unsubscribe(&self, tenant_id: &str, id: u64) {
        if let Some(subs) = self.tenants.get(tenant_id) {
            subs.remove(&id);
        }
    }
}

/// Tenant-partitioned event bus. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

impl EventBus {
    pub fn new(per_subscriber_capacity: usize) -> Self {
        EventBus {
            inner: Arc::new(EventBusInner {
                capacity: per_subscriber_capacity.max(1),
                tenants: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers a new subscriber for `tenant_id` and immediately enqueues
    /// a synthetic `connected` event for it.
    pub fn subscribe(&self, tenant_id: &str) -> Subscription {
        let ring = Arc::new(Ring::new(self.inner.capacity));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .tenants
            .entry(tenant_id.to_string())
            .or_insert_with(DashMap::new)
            .insert(id, ring.clone());
        ring.push(Event::new(EventPayload::Connected));
        Subscription {
            tenant_id: tenant_id.to_string(),
            id,
            ring,
            bus: self.inner.clone(),
        }
    }

    /// Publishes `event` to every current subscriber of `tenant_id`.
    /// Never blocks: a full subscriber queue drops its oldest entry.
    pub fn publish(&self, tenant_id: &str, event: Event) {
        let Some(subs) = self.inner.tenants.get(tenant_id) else {
            return;
        };
        if subs.is_empty() {
            return;
        }
        for entry in subs.iter() {
            entry.value().push(event.clone());
        }
    }

    /// Total number of distinct tenants with at least one subscriber.
    pub fn tenant_count(&self) -> usize {
        self.inner.tenants.len()
    }

    /// Drops every subscriber. Called during graceful shutdown.
    pub fn close(&self) {
        for tenant in self.inner.tenants.iter() {
            for entry in tenant.value().iter() {
                entry.value().notify.notify_waiters();
            }
        }
        self.inner.tenants.clear();
        warn!("event bus closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_enqueues_connected_event() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe("tenant-a");
        let batch = sub.recv_batch().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, "connected");
    }

    #[tokio::test]
    async fn publish_is_scoped_to_tenant() {
        let bus = EventBus::new(4);
        let sub_a = bus.subscribe("tenant-a");
        let _drain = sub_a.recv_batch().await;
        let sub_b = bus.subscribe("tenant-b");
        let _drain_b = sub_b.recv_batch().await;

        bus.publish("tenant-a", Event::new(EventPayload::Connected));
        let batch_a = sub_a.recv_batch().await;
        assert_eq!(batch_a.len(), 1);

        // tenant-b should have nothing new queued.
        assert_eq!(sub_b.ring.drain().len(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_and_counts_it() {
        let bus = EventBus::new(2);
        let sub = bus.subscribe("tenant-a");
        let _drain = sub.recv_batch().await;

        for _ in 0..5 {
            bus.publish("tenant-a", Event::new(EventPayload::Connected));
        }
        assert!(sub.dropped_count() > 0);
        let batch = sub.recv_batch().await;
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_on_drop_removes_from_tenant_map() {
        let bus = EventBus::new(4);
        {
            let _sub = bus.subscribe("tenant-a");
            assert_eq!(bus.tenant_count(), 1);
        }
        // subscriber dropped; tenant entry remains but is empty.
        bus.publish("tenant-a", Event::new(EventPayload::Connected));
    }
}
