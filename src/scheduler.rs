//! Update queue: the batching collaborator.
//!
//! The engine does not schedule anything itself. A non-lazy, non-sync
//! watcher that gets notified is handed to the installed [`UpdateQueue`];
//! the queue's contract is to coalesce repeat notifications of one watcher
//! within a flush window, and to flush once per window in ascending
//! identifier order, invoking each watcher's `before` hook first. Notifying
//! an already-torn-down watcher must be a safe no-op; `run` guarantees
//! that side.
//!
//! [`BatchQueue`] is the reference implementation of exactly that contract:
//! no timers, no tick integration, the host decides when to call
//! [`BatchQueue::flush`].

use std::{cell::RefCell, rc::Rc};

use rustc_hash::FxHashSet;

use crate::{
  error::report,
  rc::{MutRc, RcDeref, RcDerefMut},
  watcher::Watcher,
};

pub trait UpdateQueue {
  fn enqueue(&self, watcher: Watcher);
}

thread_local! {
  static INSTALLED: RefCell<Option<Rc<dyn UpdateQueue>>> = const { RefCell::new(None) };
}

/// Install the queue that deferred notifications are handed to.
pub fn install_queue(queue: Rc<dyn UpdateQueue>) {
  INSTALLED.with(|cell| *cell.borrow_mut() = Some(queue));
}

/// Remove the installed queue; deferred notifications run inline again.
pub fn uninstall_queue() { INSTALLED.with(|cell| *cell.borrow_mut() = None); }

pub(crate) fn installed_queue() -> Option<Rc<dyn UpdateQueue>> {
  INSTALLED.with(|cell| cell.borrow().clone())
}

#[derive(Default)]
struct BatchState {
  pending: Vec<Watcher>,
  queued_ids: FxHashSet<u64>,
}

/// Explicit-flush batched queue.
#[derive(Clone, Default)]
pub struct BatchQueue {
  state: MutRc<BatchState>,
}

impl BatchQueue {
  pub fn new() -> Self { Self::default() }

  pub fn pending_count(&self) -> usize { self.state.rc_deref().pending.len() }

  /// Run every queued watcher once, ascending by identifier. Watchers
  /// enqueued while the flush runs join the same window: the queue drains
  /// until empty. Failures of non-user watchers go to the error hook: the
  /// queue is the caller here and has nowhere else to put them.
  pub fn flush(&self) {
    loop {
      let mut batch = {
        let mut state = self.state.rc_deref_mut();
        if state.pending.is_empty() {
          return;
        }
        state.queued_ids.clear();
        std::mem::take(&mut state.pending)
      };
      batch.sort_by_key(|w| w.id());
      for watcher in batch {
        watcher.invoke_before();
        if let Err(err) = watcher.run() {
          report(&err);
        }
      }
    }
  }
}

impl UpdateQueue for BatchQueue {
  /// Deduplicates by watcher identifier within the current window.
  fn enqueue(&self, watcher: Watcher) {
    let mut state = self.state.rc_deref_mut();
    if state.queued_ids.insert(watcher.id()) {
      state.pending.push(watcher);
    }
  }
}
