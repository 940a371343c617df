//! Observable single-slot values.
//!
//! A [`Live`] holds one value and an ordered list of subscribers. Every write
//! stores the new value and then calls each subscriber with
//! `(previous, current)`, synchronously and in subscription order. Writes that
//! store an equal value still notify.
//!
//! Dispatch is reentrant: no borrow is held while subscribers run, so a
//! subscriber may write to the same or another `Live`. Nothing detects write
//! cycles; a subscriber that unconditionally writes back to its own value
//! recurses until the stack runs out.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Subscriber callback, compared by `Rc` identity on unsubscribe.
pub type Subscriber<T> = Rc<dyn Fn(&T, &T)>;

struct Inner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<Subscriber<T>>>,
}

/// A shared handle to an observable value.
///
/// Cloning the handle shares the slot; it does not copy the value.
pub struct Live<T> {
    inner: Rc<Inner<T>>,
}

/// Create a reactive value.
pub fn live<T: Clone + 'static>(initial: T) -> Live<T> {
    Live::new(initial)
}

/// Create a reactive value with one subscriber already attached.
pub fn live_with<T: Clone + 'static>(initial: T, handler: Subscriber<T>) -> Live<T> {
    let value = Live::new(initial);
    value.subscribe(handler);
    value
}

impl<T: Clone + 'static> Live<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(initial),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify every subscriber.
    pub fn set(&self, value: T) {
        let previous = self.inner.value.replace(value.clone());
        // Snapshot so subscribers can (un)subscribe while we iterate.
        let subscribers = self.inner.subscribers.borrow().clone();
        for subscriber in &subscribers {
            subscriber(&previous, &value);
        }
    }

    /// Append a subscriber. Returns `self` for chaining.
    pub fn subscribe(&self, subscriber: Subscriber<T>) -> &Self {
        self.inner.subscribers.borrow_mut().push(subscriber);
        self
    }

    /// Remove every registration of `subscriber`.
    pub fn unsubscribe(&self, subscriber: &Subscriber<T>) -> &Self {
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|s| !Rc::ptr_eq(s, subscriber));
        self
    }

    pub fn unsubscribe_all(&self) -> &Self {
        self.inner.subscribers.borrow_mut().clear();
        self
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Whether two handles share the same slot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Live<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Default + Clone + 'static> Default for Live<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Live")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}
