//! Subscriber: one computation that re-runs when its dependencies change.
//!
//! A `Watcher` evaluates its getter with itself on the evaluation context
//! stack, so every tracked read registers the subjects it touched. After
//! each evaluation the subscription set is reconciled: subjects read last
//! round but not this round drop the watcher, newly read subjects gain it.
//! That per-evaluation diff is what keeps conditional code paths from
//! leaking stale subscriptions.
//!
//! Failure discipline: watchers flagged `user` trap getter and callback
//! errors and forward them to the error hook; reconciliation runs either
//! way, so a failing watch expression cannot corrupt the dependency graph.
//! Errors of non-`user` watchers propagate to whoever asked for the
//! evaluation.
//!
//! Host closures are expected to fail through `Result`, not unwind; a panic
//! still pops the evaluation stack correctly (scope guard) but skips the
//! reconciliation of the in-flight evaluation.

use std::{
  cell::RefCell,
  rc::{Rc, Weak},
  sync::atomic::{AtomicU64, Ordering},
};

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::{
  context::TargetGuard,
  error::{report, BoxError, Error},
  scheduler,
  subject::Subject,
  traverse::traverse,
  value::Value,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

pub type Getter = Box<dyn Fn() -> Result<Value, BoxError>>;
pub type Callback = Box<dyn Fn(&Value, &Value) -> Result<(), BoxError>>;
pub type BeforeHook = Box<dyn Fn()>;

/// Construction-time configuration.
///
/// - `deep`: traverse the produced value so every nested slot becomes a
///   dependency, not just the slots the getter happened to read.
/// - `user`: client-registered watch; evaluator/callback errors are caught
///   and reported instead of propagated.
/// - `lazy`: do not evaluate eagerly; recompute on [`Watcher::value`] when
///   dirty (computed-value semantics).
/// - `sync`: react inline on notify instead of going through the update
///   queue.
/// - `before`: invoked by the update queue immediately before re-running.
#[derive(Default)]
pub struct WatchOptions {
  pub deep: bool,
  pub user: bool,
  pub lazy: bool,
  pub sync: bool,
  pub desc: Option<String>,
  pub before: Option<BeforeHook>,
}

pub(crate) struct WatcherCore {
  id: u64,
  deep: bool,
  user: bool,
  lazy: bool,
  sync: bool,
  desc: String,
  getter: Getter,
  cb: Option<Callback>,
  before: Option<BeforeHook>,
  state: RefCell<WatcherState>,
}

struct WatcherState {
  value: Value,
  dirty: bool,
  active: bool,
  deps: SmallVec<[Subject; 4]>,
  new_deps: SmallVec<[Subject; 4]>,
  dep_ids: FxHashSet<u64>,
  new_dep_ids: FxHashSet<u64>,
}

/// Cheap-clone handle to one subscriber.
#[derive(Clone)]
pub struct Watcher {
  core: Rc<WatcherCore>,
}

impl Watcher {
  /// Create a watcher and, unless `lazy`, evaluate it once so its initial
  /// dependency set is collected. A non-`user` watcher whose first
  /// evaluation fails is returned as the error.
  pub fn new(
    getter: impl Fn() -> Result<Value, BoxError> + 'static,
    cb: Option<Callback>,
    options: WatchOptions,
  ) -> Result<Watcher, Error> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let desc = options
      .desc
      .unwrap_or_else(|| format!("watcher #{id}"));
    let watcher = Watcher {
      core: Rc::new(WatcherCore {
        id,
        deep: options.deep,
        user: options.user,
        lazy: options.lazy,
        sync: options.sync,
        desc,
        getter: Box::new(getter),
        cb,
        before: options.before,
        state: RefCell::new(WatcherState {
          value: Value::Null,
          dirty: options.lazy,
          active: true,
          deps: SmallVec::new(),
          new_deps: SmallVec::new(),
          dep_ids: FxHashSet::default(),
          new_dep_ids: FxHashSet::default(),
        }),
      }),
    };
    if !watcher.core.lazy {
      let value = watcher.evaluate()?;
      watcher.core.state.borrow_mut().value = value;
    }
    Ok(watcher)
  }

  /// Monotonic identifier, assigned in creation order; the update queue
  /// sorts by it.
  #[inline]
  pub fn id(&self) -> u64 { self.core.id }

  pub fn is_active(&self) -> bool { self.core.state.borrow().active }

  /// Whether a lazy watcher needs recomputation.
  pub fn is_dirty(&self) -> bool { self.core.state.borrow().dirty }

  pub(crate) fn downgrade(&self) -> Weak<WatcherCore> { Rc::downgrade(&self.core) }

  pub(crate) fn from_core(core: Rc<WatcherCore>) -> Watcher { Watcher { core } }

  /// Evaluate the getter and re-collect dependencies.
  ///
  /// The dependency-collection protocol: push self as the evaluation
  /// target, run the getter, deep-traverse the result when `deep`, pop
  /// (guaranteed by the scope guard), then reconcile the subscription set.
  /// Reconciliation runs on the error path too.
  pub fn evaluate(&self) -> Result<Value, Error> {
    let result = {
      let _target = TargetGuard::push(self.clone());
      let result = (self.core.getter)();
      if self.core.deep {
        if let Ok(value) = &result {
          traverse(value);
        }
      }
      result
    };
    self.cleanup_deps();
    match result {
      Ok(value) => Ok(value),
      Err(source) => {
        let err = Error::Eval { context: self.core.desc.clone(), source };
        if self.core.user {
          report(&err);
          Ok(Value::Null)
        } else {
          Err(err)
        }
      }
    }
  }

  /// Record a subject read during the current evaluation. Called by
  /// [`Subject::depend`] while self is the active target.
  ///
  /// The subject joins the in-progress set at most once per round, and the
  /// watcher subscribes only when the subject was not already confirmed
  /// last round, so a kept dependency costs no list churn.
  pub fn add_dep(&self, subject: &Subject) {
    let mut state = self.core.state.borrow_mut();
    let id = subject.id();
    if state.new_dep_ids.insert(id) {
      state.new_deps.push(subject.clone());
      if !state.dep_ids.contains(&id) {
        subject.add_subscriber(self);
      }
    }
  }

  /// Drop subscriptions to subjects not read this round, then promote the
  /// in-progress set to confirmed. The two set pairs swap storage instead
  /// of reallocating.
  fn cleanup_deps(&self) {
    let mut state = self.core.state.borrow_mut();
    let state = &mut *state;
    for dep in &state.deps {
      if !state.new_dep_ids.contains(&dep.id()) {
        dep.remove_subscriber(self.core.id);
      }
    }
    std::mem::swap(&mut state.dep_ids, &mut state.new_dep_ids);
    state.new_dep_ids.clear();
    std::mem::swap(&mut state.deps, &mut state.new_deps);
    state.new_deps.clear();
  }

  /// Subscriber-interface reaction to a subject's notify.
  ///
  /// Lazy watchers only go dirty. Sync watchers re-run inline. Everything
  /// else is handed to the installed update queue, or re-run inline when
  /// no queue is installed. Errors surfacing here have no caller to
  /// propagate to and go to the error hook.
  pub fn update(&self) {
    if self.core.lazy {
      self.core.state.borrow_mut().dirty = true;
    } else if self.core.sync {
      if let Err(err) = self.run() {
        report(&err);
      }
    } else if let Some(queue) = scheduler::installed_queue() {
      queue.enqueue(self.clone());
    } else if let Err(err) = self.run() {
      report(&err);
    }
  }

  /// Re-evaluate and fire the callback.
  ///
  /// The callback is suppressed when the value is unchanged, unless the
  /// value is a container or the watcher is `deep`, where internal mutation
  /// is invisible to the top-level comparison and the callback always
  /// fires. Inactive watchers are a no-op.
  pub fn run(&self) -> Result<(), Error> {
    if !self.is_active() {
      return Ok(());
    }
    let value = self.evaluate()?;
    let fired = {
      let mut state = self.core.state.borrow_mut();
      let changed = !value.same(&state.value);
      if changed || value.is_container() || self.core.deep {
        let old = std::mem::replace(&mut state.value, value.clone());
        Some(old)
      } else {
        None
      }
    };
    let Some(old) = fired else { return Ok(()) };
    if let Some(cb) = &self.core.cb {
      if let Err(source) = cb(&value, &old) {
        let err = Error::Callback { context: self.core.desc.clone(), source };
        if self.core.user {
          report(&err);
        } else {
          return Err(err);
        }
      }
    }
    Ok(())
  }

  /// Current value; a dirty lazy watcher recomputes first. This is the
  /// computed-value access point.
  pub fn value(&self) -> Result<Value, Error> {
    if self.core.lazy && self.is_dirty() {
      let value = self.evaluate()?;
      let mut state = self.core.state.borrow_mut();
      state.value = value;
      state.dirty = false;
    }
    Ok(self.core.state.borrow().value.clone())
  }

  /// Re-register every confirmed dependency against the watcher currently
  /// evaluating. A computation that read this watcher's cached value calls
  /// this so the underlying subjects notify it too.
  pub fn depend(&self) {
    let deps: SmallVec<[Subject; 4]> = self.core.state.borrow().deps.clone();
    for dep in deps {
      dep.depend();
    }
  }

  /// Invoke the `before` hook, if any. The update queue calls this right
  /// before [`Watcher::run`].
  pub fn invoke_before(&self) {
    if let Some(before) = &self.core.before {
      before();
    }
  }

  /// Remove self from every subscribed subject and deactivate. Idempotent;
  /// an inactive watcher never re-registers and ignores further update
  /// signals.
  pub fn teardown(&self) {
    let deps = {
      let mut state = self.core.state.borrow_mut();
      if !state.active {
        return;
      }
      state.active = false;
      state.dep_ids.clear();
      std::mem::take(&mut state.deps)
    };
    for dep in deps {
      dep.remove_subscriber(self.core.id);
    }
  }
}

/// Register a watch with infallible closures. The common entry point for
/// client code; failable hosts construct a [`Watcher`] directly.
pub fn watch(
  getter: impl Fn() -> Value + 'static,
  cb: impl Fn(&Value, &Value) + 'static,
  options: WatchOptions,
) -> Watcher {
  Watcher::new(
    move || Ok(getter()),
    Some(Box::new(move |new: &Value, old: &Value| {
      cb(new, old);
      Ok(())
    })),
    options,
  )
  .expect("infallible watcher evaluator")
}

/// Owner-side bookkeeping: collects the watchers created for one host
/// computation so they can all be torn down when the owner goes away.
#[derive(Default)]
pub struct Scope {
  watchers: RefCell<Vec<Watcher>>,
}

impl Scope {
  pub fn new() -> Self { Self::default() }

  pub fn add(&self, watcher: Watcher) { self.watchers.borrow_mut().push(watcher); }

  pub fn len(&self) -> usize { self.watchers.borrow().len() }

  pub fn is_empty(&self) -> bool { self.watchers.borrow().is_empty() }

  pub fn teardown_all(&self) {
    for watcher in self.watchers.borrow_mut().drain(..) {
      watcher.teardown();
    }
  }
}
