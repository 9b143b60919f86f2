//! Evaluation context stack.
//!
//! At most one watcher is "the target" at any instant: the one whose
//! evaluator is currently running. Every tracked read registers against it.
//! The stack makes nested evaluation work: a computation that pulls a lazy
//! value re-enters the engine, and the outer watcher becomes the target
//! again once the inner one pops.
//!
//! The stack is thread-local; that placement is what enforces the
//! single-writer discipline rather than convention.

use std::cell::RefCell;

use crate::watcher::Watcher;

thread_local! {
  static TARGET_STACK: RefCell<Vec<Watcher>> = const { RefCell::new(Vec::new()) };
}

/// The watcher currently collecting dependencies, if any.
pub fn current() -> Option<Watcher> {
  TARGET_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Cheap probe for "is anyone collecting right now"; lets read paths skip
/// registration work entirely outside evaluation.
pub(crate) fn is_tracking() -> bool { TARGET_STACK.with(|stack| !stack.borrow().is_empty()) }

/// Scope guard that keeps a watcher on the target stack. Popping happens on
/// drop, so the stack unwinds correctly when an evaluator bails out early.
pub(crate) struct TargetGuard;

impl TargetGuard {
  pub(crate) fn push(watcher: Watcher) -> Self {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(watcher));
    TargetGuard
  }
}

impl Drop for TargetGuard {
  fn drop(&mut self) {
    TARGET_STACK.with(|stack| {
      stack.borrow_mut().pop();
    });
  }
}
