//! Change signals
//!
//! A [`ChangeSignal`] is a multicast notification primitive. Consumers
//! subscribe a callback and get back a [`SubscriptionId`]; firing the signal
//! invokes every live subscriber once, synchronously, in subscription order.
//!
//! Signals are single-threaded: callbacks are reference counted with `Rc`
//! so the same callback can be shared between several signals and compared
//! by identity. Subscribing a callback that is already registered is a
//! no-op that returns the existing id.
//!
//! A panicking callback is caught and logged. The remaining callbacks still
//! run, and the panic never reaches the code that fired the signal.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Shared callback type accepted by [`ChangeSignal::subscribe_shared`]
pub type Callback<T> = Rc<dyn Fn(&T)>;

/// Handle returned by [`ChangeSignal::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value of the handle
    pub fn raw(self) -> u64 {
        self.0
    }
}

struct Subscription<T> {
    id: SubscriptionId,
    callback: Callback<T>,
}

/// Multicast, synchronous change notification
pub struct ChangeSignal<T> {
    subscriptions: Vec<Subscription<T>>,
    next_id: u64,
}

impl<T> ChangeSignal<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe a new callback
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_shared(Rc::new(callback))
    }

    /// Subscribe a shared callback
    ///
    /// If the same `Rc` is already subscribed, its existing id is returned
    /// and nothing changes.
    pub fn subscribe_shared(&mut self, callback: Callback<T>) -> SubscriptionId {
        if let Some(existing) = self
            .subscriptions
            .iter()
            .find(|sub| same_callback(&sub.callback, &callback))
        {
            return existing.id;
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, callback });
        id
    }

    /// Remove a subscription, returning whether it was present
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    /// Check whether a subscription is still live
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|sub| sub.id == id)
    }

    /// Invoke every subscriber with `value`
    ///
    /// The subscriber list is snapshotted first, so callbacks that share
    /// ownership of this signal may subscribe or unsubscribe while it fires.
    pub fn fire(&self, value: &T) {
        if self.subscriptions.is_empty() {
            return;
        }

        let snapshot: Vec<(SubscriptionId, Callback<T>)> = self
            .subscriptions
            .iter()
            .map(|sub| (sub.id, Rc::clone(&sub.callback)))
            .collect();

        for (id, callback) in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(value)));
            if let Err(payload) = outcome {
                tracing::error!(
                    subscription = id.raw(),
                    "change signal subscriber panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Drop every subscription
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<T> Default for ChangeSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ChangeSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}

fn same_callback<T>(a: &Callback<T>, b: &Callback<T>) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_fire_invokes_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut signal = ChangeSignal::<i32>::new();

        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            signal.subscribe(move |value| log.borrow_mut().push(format!("{tag}{value}")));
        }

        signal.fire(&7);
        assert_eq!(*log.borrow(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_subscribe_shared_is_idempotent() {
        let count = Rc::new(Cell::new(0));
        let mut signal = ChangeSignal::<()>::new();

        let counter = Rc::clone(&count);
        let callback: Callback<()> = Rc::new(move |_| counter.set(counter.get() + 1));

        let first = signal.subscribe_shared(Rc::clone(&callback));
        let second = signal.subscribe_shared(Rc::clone(&callback));
        assert_eq!(first, second);
        assert_eq!(signal.len(), 1);

        signal.fire(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(Cell::new(0));
        let mut signal = ChangeSignal::<()>::new();

        let counter = Rc::clone(&count);
        let id = signal.subscribe(move |_| counter.set(counter.get() + 1));
        assert!(signal.is_subscribed(id));

        signal.fire(&());
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.fire(&());

        assert_eq!(count.get(), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        let reached = Rc::new(Cell::new(false));
        let mut signal = ChangeSignal::<u8>::new();

        signal.subscribe(|_| panic!("listener failure"));
        let flag = Rc::clone(&reached);
        signal.subscribe(move |_| flag.set(true));

        signal.fire(&1);
        assert!(reached.get());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut signal = ChangeSignal::<()>::new();
        let first = signal.subscribe(|_| {});
        signal.unsubscribe(first);
        let second = signal.subscribe(|_| {});
        assert_ne!(first, second);
    }
}
