//! Dependency subject: the notification hub for one observable slot.
//!
//! Every intercepted key owns a `Subject`, and every observed container owns
//! one more for its shape identity. A subject tracks the watchers currently
//! interested in its slot and broadcasts an update signal to them on
//! [`Subject::notify`].
//!
//! Subscribers are stored weakly: a watcher that was dropped without an
//! explicit teardown simply fails to upgrade and is pruned on the next
//! notify, so a stale subscription can never fire.

use std::{
  cell::RefCell,
  rc::{Rc, Weak},
  sync::atomic::{AtomicU64, Ordering},
};

use smallvec::SmallVec;

use crate::{
  config, context,
  watcher::{Watcher, WatcherCore},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

struct SubEntry {
  id: u64,
  watcher: Weak<WatcherCore>,
}

struct SubjectCore {
  id: u64,
  subs: RefCell<SmallVec<[SubEntry; 2]>>,
}

/// Cheap-clone handle to one slot's notification hub.
#[derive(Clone)]
pub struct Subject(Rc<SubjectCore>);

impl Default for Subject {
  fn default() -> Self { Self::new() }
}

impl Subject {
  pub fn new() -> Self {
    Subject(Rc::new(SubjectCore {
      id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
      subs: RefCell::new(SmallVec::new()),
    }))
  }

  /// Monotonic identifier, assigned in creation order.
  #[inline]
  pub fn id(&self) -> u64 { self.0.id }

  /// Append a subscriber. The watcher side guarantees it does not subscribe
  /// twice, so no duplicate check happens here.
  pub fn add_subscriber(&self, watcher: &Watcher) {
    self.0.subs.borrow_mut().push(SubEntry {
      id: watcher.id(),
      watcher: watcher.downgrade(),
    });
  }

  /// Remove a subscriber by identifier. No-op if absent.
  pub fn remove_subscriber(&self, watcher_id: u64) {
    self.0.subs.borrow_mut().retain(|e| e.id != watcher_id);
  }

  pub fn subscriber_count(&self) -> usize {
    self
      .0
      .subs
      .borrow()
      .iter()
      .filter(|e| e.watcher.strong_count() > 0)
      .count()
  }

  /// Register the currently evaluating watcher, if any, against this
  /// subject. The has/add decision is the watcher's.
  pub fn depend(&self) {
    if let Some(target) = context::current() {
      target.add_dep(self);
    }
  }

  /// Dispatch an update signal to every current subscriber.
  ///
  /// The list is snapshotted first so subscriptions added or removed while
  /// subscribers run do not affect this round; dead weak entries are pruned
  /// in the same pass. When async mode is off, the snapshot is sorted by
  /// ascending identifier so subscribers fire in creation order; in async
  /// mode the update queue is the one responsible for that ordering.
  pub fn notify(&self) {
    let mut snapshot: SmallVec<[Watcher; 4]> = {
      let mut subs = self.0.subs.borrow_mut();
      subs.retain(|e| e.watcher.strong_count() > 0);
      subs
        .iter()
        .filter_map(|e| e.watcher.upgrade().map(Watcher::from_core))
        .collect()
    };
    if !config::is_async() {
      snapshot.sort_by_key(|w| w.id());
    }
    for watcher in snapshot {
      watcher.update();
    }
  }
}
