//! Per-kind listener registry.
//!
//! Listeners for one kind run in subscription order. Dispatch copies the
//! listener list before calling anything and releases the lock, so a
//! listener may subscribe or unsubscribe (itself or others) from inside its
//! callback:
//!
//! - a listener removed during dispatch is skipped for the rest of that
//!   dispatch;
//! - a listener added during dispatch first runs on the next one.

use crate::types::{Subscription, SubscriptionId};
use bridge_traits::media::MediaEventKind;
use core_runtime::events::PlaybackEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback invoked for every notification of the kind it subscribed to.
#[cfg(not(target_arch = "wasm32"))]
pub type Listener = Arc<dyn Fn(&PlaybackEvent) + Send + Sync>;

/// Callback invoked for every notification of the kind it subscribed to.
#[cfg(target_arch = "wasm32")]
pub type Listener = Arc<dyn Fn(&PlaybackEvent)>;

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<MediaEventKind, Vec<(SubscriptionId, Listener)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: MediaEventKind, listener: Listener) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners
            .lock()
            .entry(kind)
            .or_default()
            .push((id, listener));
        Subscription { id, kind }
    }

    /// Removes exactly the listener behind `subscription`. Returns `false` if
    /// it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(&subscription.kind) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != subscription.id);
        let removed = entries.len() != before;

        if entries.is_empty() {
            listeners.remove(&subscription.kind);
        }
        removed
    }

    pub fn listener_count(&self, kind: MediaEventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    pub fn total_count(&self) -> usize {
        self.listeners.lock().values().map(Vec::len).sum()
    }

    fn snapshot(&self, kind: MediaEventKind) -> Vec<(SubscriptionId, Listener)> {
        self.listeners
            .lock()
            .get(&kind)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, l)| (*id, Arc::clone(l)))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_registered(&self, kind: MediaEventKind, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .get(&kind)
            .is_some_and(|entries| entries.iter().any(|(entry, _)| *entry == id))
    }

    /// Invokes every listener of `event.kind`. Returns how many ran.
    pub fn dispatch(&self, event: &PlaybackEvent) -> usize {
        let mut ran = 0;
        for (id, listener) in self.snapshot(event.kind) {
            if !self.is_registered(event.kind, id) {
                continue;
            }
            listener(event);
            ran += 1;
        }
        ran
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.total_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn recorder(log: &Arc<StdMutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |_event: &PlaybackEvent| log.lock().unwrap().push(name))
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        registry.subscribe(MediaEventKind::Play, recorder(&log, "first"));
        registry.subscribe(MediaEventKind::Play, recorder(&log, "second"));
        registry.subscribe(MediaEventKind::Pause, recorder(&log, "other-kind"));

        let ran = registry.dispatch(&PlaybackEvent::new(MediaEventKind::Play));

        assert_eq!(ran, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_exactly_one() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(StdMutex::new(Vec::new()));

        let a = registry.subscribe(MediaEventKind::Ended, recorder(&log, "a"));
        let _b = registry.subscribe(MediaEventKind::Ended, recorder(&log, "b"));

        assert!(registry.unsubscribe(&a));
        assert!(!registry.unsubscribe(&a));
        assert_eq!(registry.listener_count(MediaEventKind::Ended), 1);

        registry.dispatch(&PlaybackEvent::new(MediaEventKind::Ended));
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let registry = ListenerRegistry::new();
        let noop: Listener = Arc::new(|_: &PlaybackEvent| {});
        let a = registry.subscribe(MediaEventKind::Play, Arc::clone(&noop));
        let b = registry.subscribe(MediaEventKind::Pause, noop);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn removal_during_dispatch_skips_listener() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let victim: Arc<StdMutex<Option<Subscription>>> = Arc::new(StdMutex::new(None));

        let remover = {
            let registry = Arc::clone(&registry);
            let victim = Arc::clone(&victim);
            let log = Arc::clone(&log);
            Arc::new(move |_event: &PlaybackEvent| {
                log.lock().unwrap().push("remover");
                if let Some(sub) = victim.lock().unwrap().take() {
                    registry.unsubscribe(&sub);
                }
            })
        };
        registry.subscribe(MediaEventKind::TimeUpdate, remover);
        let sub = registry.subscribe(MediaEventKind::TimeUpdate, recorder(&log, "victim"));
        *victim.lock().unwrap() = Some(sub);

        let ran = registry.dispatch(&PlaybackEvent::new(MediaEventKind::TimeUpdate));
        assert_eq!(ran, 1);
        assert_eq!(*log.lock().unwrap(), vec!["remover"]);

        registry.dispatch(&PlaybackEvent::new(MediaEventKind::TimeUpdate));
        assert_eq!(*log.lock().unwrap(), vec!["remover", "remover"]);
    }

    #[test]
    fn addition_during_dispatch_waits_for_next() {
        let registry = Arc::new(ListenerRegistry::new());
        let log = Arc::new(StdMutex::new(Vec::new()));

        let adder = {
            let registry = Arc::clone(&registry);
            let log = Arc::clone(&log);
            let added = Arc::new(StdMutex::new(false));
            Arc::new(move |_event: &PlaybackEvent| {
                log.lock().unwrap().push("adder");
                let mut added = added.lock().unwrap();
                if !*added {
                    *added = true;
                    registry.subscribe(MediaEventKind::Waiting, recorder(&log, "late"));
                }
            })
        };
        registry.subscribe(MediaEventKind::Waiting, adder);

        registry.dispatch(&PlaybackEvent::new(MediaEventKind::Waiting));
        assert_eq!(*log.lock().unwrap(), vec!["adder"]);

        registry.dispatch(&PlaybackEvent::new(MediaEventKind::Waiting));
        assert_eq!(*log.lock().unwrap(), vec!["adder", "adder", "late"]);
    }

    #[test]
    fn clear_drops_everything() {
        let registry = ListenerRegistry::new();
        registry.subscribe(MediaEventKind::Play, Arc::new(|_: &PlaybackEvent| {}));
        registry.subscribe(MediaEventKind::Error, Arc::new(|_: &PlaybackEvent| {}));
        assert_eq!(registry.total_count(), 2);

        registry.clear();
        assert_eq!(registry.total_count(), 0);
        assert_eq!(registry.dispatch(&PlaybackEvent::new(MediaEventKind::Play)), 0);
    }
}
