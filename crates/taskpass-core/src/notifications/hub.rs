use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// A notification as handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedNotification {
    pub notification: Notification,
    pub received_at: DateTime<Utc>,
}

type Listener = Arc<dyn Fn(&ReceivedNotification) + Send + Sync>;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl HubInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64) {
        self.listeners().retain(|(listener_id, _)| *listener_id != id);
        debug!(id, "Notification listener removed");
    }
}

/// Fan-out point for local notifications.
/// Clone is cheap - clones share the same listener list.
#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned handle is dropped.
    #[must_use = "dropping the subscription removes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ReceivedNotification) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push((id, Arc::new(listener)));
        debug!(id, "Notification listener added");
        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }

    /// Hand `notification` to every live listener; returns how many were called
    pub fn deliver(&self, notification: Notification) -> usize {
        let received = ReceivedNotification {
            notification,
            received_at: Utc::now(),
        };

        // Snapshot so listeners can subscribe or unsubscribe while being called.
        let listeners: Vec<Listener> = self
            .inner
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(&received);
        }
        debug!(
            title = %received.notification.title,
            listeners = listeners.len(),
            "Notification delivered"
        );
        listeners.len()
    }

    /// Deliver `notification` once after `delay`. Must be called within a tokio runtime.
    #[must_use = "dropping the handle cancels the notification"]
    pub fn schedule(&self, notification: Notification, delay: Duration) -> ScheduledNotification {
        let hub = self.clone();
        debug!(
            title = %notification.title,
            delay_ms = delay.as_millis() as u64,
            "Notification scheduled"
        );
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            hub.deliver(notification);
        });
        ScheduledNotification { handle }
    }
}

/// Listener registration. Dropping it removes the listener.
pub struct Subscription {
    hub: Weak<HubInner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.remove(self.id);
        }
    }
}

/// Pending delayed notification. Dropping it before it fires cancels it.
pub struct ScheduledNotification {
    handle: JoinHandle<()>,
}

impl ScheduledNotification {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {}
}

impl Drop for ScheduledNotification {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_listener(hub: &NotificationHub) -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscription = hub.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (subscription, count)
    }

    #[test]
    fn test_deliver_reaches_every_listener() {
        let hub = NotificationHub::new();
        let (_first, first_count) = counting_listener(&hub);
        let (_second, second_count) = counting_listener(&hub);

        assert_eq!(hub.deliver(Notification::new("Hello", "World")), 2);
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_subscription_receives_nothing() {
        let hub = NotificationHub::new();
        let (subscription, count) = counting_listener(&hub);
        drop(subscription);

        assert_eq!(hub.listener_count(), 0);
        assert_eq!(hub.deliver(Notification::new("Hello", "World")), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_only_removes_its_listener() {
        let hub = NotificationHub::new();
        let (first, first_count) = counting_listener(&hub);
        let (_second, second_count) = counting_listener(&hub);
        first.unsubscribe();

        hub.deliver(Notification::new("Hello", "World"));
        assert_eq!(first_count.load(Ordering::SeqCst), 0);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let hub = NotificationHub::new();
        let (subscription, _count) = counting_listener(&hub);
        drop(hub);
        drop(subscription);
    }

    #[test]
    fn test_listener_sees_payload() {
        let hub = NotificationHub::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let _subscription = hub.subscribe(move |received| {
            *slot.lock().unwrap() = Some(received.notification.clone());
        });

        let notification =
            Notification::new("New task", "Buy milk").with_data(serde_json::json!({"id": 1}));
        hub.deliver(notification.clone());

        assert_eq!(*seen.lock().unwrap(), Some(notification));
    }

    #[tokio::test]
    async fn test_scheduled_notification_fires() {
        let hub = NotificationHub::new();
        let (_subscription, count) = counting_listener(&hub);

        let scheduled = hub.schedule(Notification::new("Later", "Ping"), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(scheduled.is_finished());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_notification_never_fires() {
        let hub = NotificationHub::new();
        let (_subscription, count) = counting_listener(&hub);

        let scheduled = hub.schedule(Notification::new("Later", "Ping"), Duration::from_millis(50));
        scheduled.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
