//! Error taxonomy and the error-report hook.
//!
//! Failures raised by host closures come in two flavors: an evaluator
//! failed while computing a watcher's value, or a callback failed while
//! reacting to a change. Watchers flagged `user` route both to [`report`]
//! instead of propagating, so a misbehaving watch expression cannot abort
//! the process or corrupt dependency bookkeeping.

use std::cell::RefCell;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("evaluator failed for {context}: {source}")]
  Eval { context: String, source: BoxError },

  #[error("callback failed for {context}: {source}")]
  Callback { context: String, source: BoxError },
}

impl Error {
  pub fn context(&self) -> &str {
    match self {
      Error::Eval { context, .. } | Error::Callback { context, .. } => context,
    }
  }
}

pub type ErrorHook = Box<dyn Fn(&Error)>;

thread_local! {
  static ERROR_HOOK: RefCell<Option<ErrorHook>> = const { RefCell::new(None) };
}

/// Install a hook receiving every reported error on this thread. Replaces
/// any previous hook; `None`-like reset is done by installing a new one.
pub fn set_error_hook(hook: impl Fn(&Error) + 'static) {
  ERROR_HOOK.with(|cell| *cell.borrow_mut() = Some(Box::new(hook)));
}

/// Remove the installed hook; reports fall back to the log.
pub fn clear_error_hook() {
  ERROR_HOOK.with(|cell| *cell.borrow_mut() = None);
}

/// Route an error to the installed hook, or to the log when none is
/// installed. Never panics, never re-raises.
pub fn report(err: &Error) {
  let handled = ERROR_HOOK.with(|cell| {
    if let Some(hook) = cell.borrow().as_ref() {
      hook(err);
      true
    } else {
      false
    }
  });
  if !handled {
    tracing::error!(context = err.context(), "{err}");
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;

  #[test]
  fn hook_receives_reports() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let c_seen = seen.clone();
    set_error_hook(move |err| c_seen.borrow_mut().push(err.context().to_string()));

    report(&Error::Eval {
      context: "watcher #1".into(),
      source: "boom".into(),
    });
    assert_eq!(*seen.borrow(), vec!["watcher #1".to_string()]);
    clear_error_hook();
  }

  #[test]
  fn report_without_hook_does_not_panic() {
    clear_error_hook();
    report(&Error::Callback {
      context: "watcher #2".into(),
      source: "boom".into(),
    });
  }
}
