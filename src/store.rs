//! Single-threaded observable values.
//!
//! `Writable` notifies its subscribers after every change. `Derived` is a
//! read-only value recomputed from two upstream stores each time either of
//! them notifies.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback<T> = Box<dyn FnMut(&T)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SubscriptionId(u64);

struct Inner<T> {
    value: T,
    subscribers: Vec<(SubscriptionId, Callback<T>)>,
    next_id: u64,
    notifying: bool,
    /// A `set` arrived while subscribers were running.
    dirty: bool,
    /// Unsubscribed while their list was checked out by `notify`.
    removed: Vec<SubscriptionId>,
}

pub(crate) struct Writable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Writable<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                subscribers: Vec::new(),
                next_id: 0,
                notifying: false,
                dirty: false,
                removed: Vec::new(),
            })),
        }
    }

    pub(crate) fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    pub(crate) fn set(&self, value: T) {
        self.inner.borrow_mut().value = value;
        self.notify();
    }

    pub(crate) fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.borrow().value);
        self.set(next);
    }

    /// Like `update`, but `None` leaves the value alone and skips notifying.
    pub(crate) fn update_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let next = f(&self.inner.borrow().value);
        match next {
            Some(value) => {
                self.set(value);
                true
            }
            None => false,
        }
    }

    /// Calls `callback` with the current value right away, then after every
    /// change.
    pub(crate) fn subscribe(&self, mut callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        callback(&self.get());
        self.observe(callback)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        if inner.notifying {
            inner.removed.push(id);
        }
    }

    /// Registers `callback` for future changes only.
    fn observe(&self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Runs subscribers outside the borrow so they may read, set, subscribe
    /// or unsubscribe on this store. A `set` from inside a callback is
    /// delivered as one more round with the latest value once the current
    /// round finishes.
    fn notify(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.notifying {
                inner.dirty = true;
                return;
            }
            inner.notifying = true;
        }
        loop {
            let (value, mut running) = {
                let mut inner = self.inner.borrow_mut();
                inner.dirty = false;
                (inner.value.clone(), std::mem::take(&mut inner.subscribers))
            };
            for (id, callback) in running.iter_mut() {
                if self.inner.borrow().removed.contains(id) {
                    continue;
                }
                callback(&value);
            }
            let mut inner = self.inner.borrow_mut();
            let removed = std::mem::take(&mut inner.removed);
            running.retain(|(id, _)| !removed.contains(id));
            let added = std::mem::take(&mut inner.subscribers);
            running.extend(added);
            inner.subscribers = running;
            if !inner.dirty {
                inner.notifying = false;
                return;
            }
        }
    }

    fn downgrade(&self) -> Weak<RefCell<Inner<T>>> {
        Rc::downgrade(&self.inner)
    }
}

pub(crate) struct Derived<T> {
    output: Writable<T>,
}

impl<T: Clone + 'static> Derived<T> {
    pub(crate) fn from2<A, B>(
        a: &Writable<A>,
        b: &Writable<B>,
        compute: impl Fn(&A, &B) -> T + 'static,
    ) -> Self
    where
        A: Clone + 'static,
        B: Clone + 'static,
    {
        let compute = Rc::new(compute);
        let output = Writable::new(compute(&a.get(), &b.get()));

        // Upstream stores only hold weak handles, so dropping either side
        // leaves no reference cycle behind.
        let target = output.downgrade();
        let other = b.downgrade();
        let f = Rc::clone(&compute);
        a.observe(move |a_value| {
            if let (Some(inner), Some(other)) = (target.upgrade(), other.upgrade()) {
                let value = f(a_value, &other.borrow().value);
                Writable { inner }.set(value);
            }
        });

        let target = output.downgrade();
        let other = a.downgrade();
        b.observe(move |b_value| {
            if let (Some(inner), Some(other)) = (target.upgrade(), other.upgrade()) {
                let value = compute(&other.borrow().value, b_value);
                Writable { inner }.set(value);
            }
        });

        Self { output }
    }

    pub(crate) fn get(&self) -> T {
        self.output.get()
    }

    pub(crate) fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        self.output.subscribe(callback)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        self.output.unsubscribe(id);
    }
}

/// Replaces the first element matching `pred` with `update(element)`.
/// Returns the input slice untouched when nothing matches.
pub(crate) fn update_first<'a, T: Clone>(
    items: &'a [T],
    pred: impl Fn(&T) -> bool,
    update: impl FnOnce(&T) -> T,
) -> Cow<'a, [T]> {
    match items.iter().position(pred) {
        Some(index) => {
            let mut next = items.to_vec();
            next[index] = update(&items[index]);
            Cow::Owned(next)
        }
        None => Cow::Borrowed(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[test]
    fn subscribe_sees_current_then_changes() {
        let store = Writable::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |value| sink.borrow_mut().push(*value));
        store.set(2);
        store.update(|value| value * 10);
        assert_eq!(*seen.borrow(), vec![1, 2, 20]);
    }

    #[test]
    fn update_if_none_does_not_notify() {
        let store = Writable::new(5);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_| counter.set(counter.get() + 1));
        assert!(!store.update_if(|_| None));
        assert!(store.update_if(|value| Some(value + 1)));
        assert_eq!(calls.get(), 2);
        assert_eq!(store.get(), 6);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Writable::new(0);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let id = store.subscribe(move |_| counter.set(counter.get() + 1));
        store.unsubscribe(id);
        store.set(1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn callback_can_read_its_own_store() {
        let store = Writable::new(String::from("a"));
        let reader = store.clone();
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |_| *sink.borrow_mut() = reader.get());
        store.set("b".to_string());
        assert_eq!(*seen.borrow(), "b");
    }

    #[test]
    fn unsubscribe_from_inside_callback() {
        let store = Writable::new(0);
        let calls = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));
        let counter = Rc::clone(&calls);
        let id_slot = Rc::clone(&own_id);
        let handle = store.clone();
        let id = store.subscribe(move |value| {
            counter.set(counter.get() + 1);
            if *value == 1 {
                if let Some(id) = id_slot.get() {
                    handle.unsubscribe(id);
                }
            }
        });
        own_id.set(Some(id));
        store.set(1);
        store.set(2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn unsubscribe_sibling_mid_round() {
        let store = Writable::new(0);
        let later_calls = Rc::new(Cell::new(0));
        let later_id = Rc::new(Cell::new(None));
        let handle = store.clone();
        let id_slot = Rc::clone(&later_id);
        store.observe(move |_| {
            if let Some(id) = id_slot.get() {
                handle.unsubscribe(id);
            }
        });
        let counter = Rc::clone(&later_calls);
        later_id.set(Some(store.observe(move |_| counter.set(counter.get() + 1))));
        store.set(1);
        store.set(2);
        assert_eq!(later_calls.get(), 0);
    }

    #[test]
    fn set_from_inside_callback_is_delivered() {
        let store = Writable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let handle = store.clone();
        store.observe(move |value| {
            if *value < 3 {
                handle.set(value + 1);
            }
        });
        let sink = Rc::clone(&seen);
        store.observe(move |value| sink.borrow_mut().push(*value));
        store.set(1);
        assert_eq!(store.get(), 3);
        assert_eq!(seen.borrow().last(), Some(&3));
    }

    #[test]
    fn derived_recomputes_once_per_change() {
        let a = Writable::new(2);
        let b = Writable::new(3);
        let product = Derived::from2(&a, &b, |a, b| a * b);
        assert_eq!(product.get(), 6);

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        product.subscribe(move |_| counter.set(counter.get() + 1));
        a.set(4);
        b.set(5);
        assert_eq!(product.get(), 20);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn dropped_derived_detaches() {
        let a = Writable::new(1);
        let b = Writable::new(1);
        let sum = Derived::from2(&a, &b, |a, b| a + b);
        drop(sum);
        a.set(2);
        assert_eq!(a.get(), 2);
    }

    #[test]
    fn update_first_replaces_only_first_match() {
        let items = vec![1, 2, 3, 2];
        let next = update_first(&items, |item| *item == 2, |item| item * 10);
        assert_eq!(next.as_ref(), &[1, 20, 3, 2]);
        assert!(matches!(next, Cow::Owned(_)));
    }

    #[test]
    fn update_first_without_match_borrows() {
        let items = vec![1, 2, 3];
        let next = update_first(&items, |item| *item == 9, |item| item * 10);
        assert!(matches!(next, Cow::Borrowed(slice) if std::ptr::eq(slice, items.as_slice())));
    }
}
