//! Synchronous, typed events.
//!
//! An [`Event`] is a publish/subscribe channel for exactly one kind of
//! notification. Handlers are called on the emitting thread, before
//! [`Event::emit`] returns, in the order they were registered.
//!
//! ```
//! use std::sync::{
//!   Arc,
//!   atomic::{
//!     AtomicUsize,
//!     Ordering,
//!   },
//! };
//!
//! use the_cmdline_event::Event;
//!
//! let changed: Event<String> = Event::new("canon_change");
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let id = changed.subscribe({
//!   let seen = seen.clone();
//!   move |_name: &String| {
//!     seen.fetch_add(1, Ordering::Relaxed);
//!   }
//! });
//!
//! changed.emit(&"echo".to_string());
//! assert!(changed.unsubscribe(id));
//! changed.emit(&"echo".to_string());
//!
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//! ```

use std::{
  fmt,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

/// A registered event handler.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies one subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub struct Event<T> {
  name:     &'static str,
  handlers: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
  next_id:  AtomicU64,
}

impl<T> Event<T> {
  pub fn new(name: &'static str) -> Self {
    Self {
      name,
      handlers: Mutex::new(Vec::new()),
      next_id: AtomicU64::new(1),
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Registers `handler`; it runs after every handler registered before it.
  pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
  where
    F: Fn(&T) + Send + Sync + 'static,
  {
    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.handlers.lock().push((id, Arc::new(handler)));
    id
  }

  /// Removes a subscription. Returns `false` when it was already gone.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    let mut handlers = self.handlers.lock();
    let before = handlers.len();
    handlers.retain(|(handler_id, _)| *handler_id != id);
    handlers.len() != before
  }

  /// Removes every subscription.
  pub fn clear(&self) {
    self.handlers.lock().clear();
  }

  pub fn len(&self) -> usize {
    self.handlers.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.lock().is_empty()
  }

  /// Delivers `payload` to every handler.
  ///
  /// The handler list is snapshotted first, so a handler may subscribe or
  /// unsubscribe without deadlocking; such changes apply from the next emit.
  pub fn emit(&self, payload: &T) {
    let handlers: SmallVec<[Handler<T>; 4]> = self
      .handlers
      .lock()
      .iter()
      .map(|(_, handler)| handler.clone())
      .collect();

    for handler in handlers {
      handler(payload);
    }
  }
}

impl<T> fmt::Debug for Event<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Event")
      .field("name", &self.name)
      .field("handlers", &self.len())
      .finish()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn delivers_in_registration_order() {
    let event: Event<u32> = Event::new("test");
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in ["a", "b", "c"] {
      let log = log.clone();
      event.subscribe(move |value: &u32| log.lock().push(format!("{tag}{value}")));
    }

    event.emit(&1);
    event.emit(&2);

    assert_eq!(*log.lock(), vec!["a1", "b1", "c1", "a2", "b2", "c2"]);
  }

  #[test]
  fn unsubscribe_removes_only_that_handler() {
    let event: Event<()> = Event::new("test");
    let count = Arc::new(AtomicU64::new(0));

    let first = event.subscribe({
      let count = count.clone();
      move |_| {
        count.fetch_add(1, Ordering::Relaxed);
      }
    });
    event.subscribe({
      let count = count.clone();
      move |_| {
        count.fetch_add(10, Ordering::Relaxed);
      }
    });

    assert!(event.unsubscribe(first));
    assert!(!event.unsubscribe(first));
    event.emit(&());

    assert_eq!(count.load(Ordering::Relaxed), 10);
    assert_eq!(event.len(), 1);
  }

  #[test]
  fn handler_may_subscribe_during_emit() {
    let event: Arc<Event<()>> = Arc::new(Event::new("test"));
    let count = Arc::new(AtomicU64::new(0));

    event.subscribe({
      let event = event.clone();
      let count = count.clone();
      move |_| {
        let count = count.clone();
        event.subscribe(move |_| {
          count.fetch_add(1, Ordering::Relaxed);
        });
      }
    });

    event.emit(&());
    assert_eq!(count.load(Ordering::Relaxed), 0);
    assert_eq!(event.len(), 2);
  }
}
