//! Observation entry points.
//!
//! [`observe`] converts a plain container into observable state: records get
//! one reactive cell per key, sequences get their mutating operations
//! intercepted, and every nested value is observed eagerly. Re-observing is
//! a cache hit. That idempotence is also what makes cyclic graphs
//! terminate, because the second encounter of a container finds the record
//! installed by the first.
//!
//! [`set`] and [`del`] are the escape hatches for shape changes: adding a
//! key the record did not declare, or removing one, cannot be intercepted by
//! a per-key cell, so it must go through these to notify the container's
//! shape subject.

use std::{cell::Cell, rc::Rc};

use crate::{subject::Subject, value::Value};

thread_local! {
  static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Suspend or resume observation on this thread. While suspended,
/// [`observe`] is a no-op; collaborators use this around bulk internal
/// mutation that must not become reactive.
pub fn toggle_observing(on: bool) { SHOULD_OBSERVE.with(|flag| flag.set(on)) }

pub(crate) fn is_observing() -> bool { SHOULD_OBSERVE.with(|flag| flag.get()) }

struct ObservedCore {
  dep: Subject,
  root_count: Cell<u32>,
}

/// Observation record attached to one observed container: the container's
/// shape-identity subject plus the count of root-state owners holding it.
#[derive(Clone)]
pub struct Observed(Rc<ObservedCore>);

impl Observed {
  pub(crate) fn new() -> Self {
    Observed(Rc::new(ObservedCore {
      dep: Subject::new(),
      root_count: Cell::new(0),
    }))
  }

  /// The shape-identity subject: notified when the container's set of
  /// keys/elements changes, independent of any single slot.
  pub fn dep(&self) -> &Subject { &self.0.dep }

  /// How many root-state owners currently treat this container as their
  /// root. Nonzero blocks runtime key addition/removal.
  pub fn root_count(&self) -> u32 { self.0.root_count.get() }

  pub(crate) fn inc_root_count(&self) { self.0.root_count.set(self.0.root_count.get() + 1); }

  /// Identity comparison: two handles to the same observation record.
  pub fn ptr_eq(&self, other: &Observed) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

/// Make a value observable.
///
/// Primitives are a no-op. An already-observed container returns its
/// existing record. Otherwise a record is attached and the whole reachable
/// graph is walked, unless observation is suspended, the server-rendering
/// check fires, or the container was excluded with [`mark_raw`].
///
/// `as_root` marks the container as the root state of one owner, which
/// blocks later runtime shape changes through [`set`]/[`del`].
pub fn observe(value: &Value, as_root: bool) -> Option<Observed> {
  let ob = match value {
    Value::Map(map) => map.ensure_observed(),
    Value::List(list) => list.ensure_observed(),
    _ => None,
  };
  if as_root {
    if let Some(ob) = &ob {
      ob.inc_root_count();
    }
  }
  ob
}

/// Permanently exclude a container from observation. No-op with a warning
/// if the container is already observed.
pub fn mark_raw(value: &Value) {
  match value {
    Value::Map(map) => map.set_raw(),
    Value::List(list) => list.set_raw(),
    _ => {}
  }
}

/// A slot address for [`set`]/[`del`]: a record key or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
  Name(String),
  Index(usize),
}

impl From<&str> for Key {
  fn from(k: &str) -> Self { Key::Name(k.to_owned()) }
}

impl From<String> for Key {
  fn from(k: String) -> Self { Key::Name(k) }
}

impl From<usize> for Key {
  fn from(i: usize) -> Self { Key::Index(i) }
}

/// Set a slot on a container, adding it reactively if it does not exist.
///
/// Sequence indices route through the intercepted splice path so the write
/// notifies; record keys either hit the existing reactive cell or install a
/// fresh one and notify the shape subject. Adding keys to a root-state
/// owner's container is refused with a warning; root-level keys must be
/// declared upfront. Returns the value for call chaining.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
  match (target, key.into()) {
    (Value::List(list), Key::Index(index)) => list.set_index(index, value.clone()),
    (Value::Map(map), Key::Name(name)) => map.set(name, value.clone()),
    // Numeric keys on records address the key's decimal spelling.
    (Value::Map(map), Key::Index(index)) => map.set(index.to_string(), value.clone()),
    (Value::List(_), Key::Name(name)) => {
      tracing::warn!(key = %name, "cannot set a named key on a sequence");
    }
    (other, _) => {
      tracing::warn!(
        target_type = other.type_name(),
        "cannot set a reactive slot on a primitive value"
      );
    }
  }
  value
}

/// Delete a slot and notify the container's shape subject. Missing slots
/// and primitive targets are no-ops; root-state owners refuse as in
/// [`set`].
pub fn del(target: &Value, key: impl Into<Key>) {
  match (target, key.into()) {
    (Value::List(list), Key::Index(index)) => {
      list.remove(index);
    }
    (Value::Map(map), Key::Name(name)) => map.delete(&name),
    (Value::Map(map), Key::Index(index)) => map.delete(&index.to_string()),
    (Value::List(_), Key::Name(name)) => {
      tracing::warn!(key = %name, "cannot delete a named key on a sequence");
    }
    (other, _) => {
      tracing::warn!(
        target_type = other.type_name(),
        "cannot delete a reactive slot on a primitive value"
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::{
    list::List,
    map::Map,
    watcher::{watch, WatchOptions},
  };

  #[test]
  fn observe_skips_primitives() {
    assert!(observe(&Value::from(1), false).is_none());
    assert!(observe(&Value::Null, true).is_none());
  }

  #[test]
  fn observe_is_idempotent() {
    let state = Value::from(Map::from_pairs([("a", Value::from(1))]));
    let first = observe(&state, false).unwrap();
    let second = observe(&state, false).unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(first.dep().id(), second.dep().id());
  }

  #[test]
  fn observe_walks_nested_containers() {
    let inner = Map::from_pairs([("x", Value::from(1))]);
    let items = List::from_values(vec![Value::from(inner.clone())]);
    let state = Value::from(Map::from_pairs([("items", Value::from(items))]));

    observe(&state, false);
    assert!(Value::from(inner).observed().is_some());
  }

  #[test]
  fn observe_tolerates_cycles() {
    let map = Map::new();
    map.set("me", Value::from(map.clone()));
    let state = Value::from(map.clone());

    let ob = observe(&state, false).unwrap();
    let again = observe(&map.get("me").unwrap(), false).unwrap();
    assert!(ob.ptr_eq(&again));
  }

  #[test]
  fn toggle_suspends_observation() {
    toggle_observing(false);
    let state = Value::from(Map::new());
    assert!(observe(&state, false).is_none());
    toggle_observing(true);
    assert!(observe(&state, false).is_some());
  }

  #[test]
  fn raw_containers_are_never_observed() {
    let state = Value::from(Map::new());
    mark_raw(&state);
    assert!(observe(&state, false).is_none());
  }

  #[test]
  fn root_count_tracks_owners() {
    let state = Value::from(Map::new());
    let ob = observe(&state, true).unwrap();
    assert_eq!(ob.root_count(), 1);
    observe(&state, true);
    assert_eq!(ob.root_count(), 2);
  }

  #[test]
  fn set_installs_a_reactive_key_and_notifies_shape() {
    let map = Map::from_pairs([("a", Value::from(1))]);
    let state = Value::from(map.clone());
    observe(&state, false);

    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let m = map.clone();
    let _w = watch(
      move || Value::from(m.len() as i64),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { sync: true, ..Default::default() },
    );

    set(&state, "b", Value::from(2));
    assert_eq!(*hits.borrow(), 1);

    // The fresh key is itself reactive.
    let seen = Rc::new(RefCell::new(Vec::new()));
    let c_seen = seen.clone();
    let m = map.clone();
    let _w2 = watch(
      move || m.get("b").unwrap_or_default(),
      move |new, _| c_seen.borrow_mut().push(new.as_int()),
      WatchOptions { sync: true, ..Default::default() },
    );
    map.set("b", Value::from(3));
    assert_eq!(*seen.borrow(), vec![Some(3)]);
  }

  #[test]
  fn set_refuses_new_keys_on_root_state() {
    let map = Map::from_pairs([("a", Value::from(1))]);
    let state = Value::from(map.clone());
    observe(&state, true);

    set(&state, "b", Value::from(2));
    assert!(map.get("b").is_none());
    // Existing keys still write through.
    set(&state, "a", Value::from(5));
    assert_eq!(map.get("a").and_then(|v| v.as_int()), Some(5));
  }

  #[test]
  fn del_notifies_shape() {
    let map = Map::from_pairs([("a", Value::from(1)), ("b", Value::from(2))]);
    let state = Value::from(map.clone());
    observe(&state, false);

    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let m = map.clone();
    let _w = watch(
      move || Value::from(m.len() as i64),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { sync: true, ..Default::default() },
    );

    del(&state, "b");
    assert_eq!(*hits.borrow(), 1);
    assert!(map.get("b").is_none());

    // Deleting a missing key changes nothing and notifies nobody.
    del(&state, "b");
    assert_eq!(*hits.borrow(), 1);
  }

  #[test]
  fn set_on_primitives_is_a_reported_noop() {
    let v = set(&Value::from(1), "a", Value::from(2));
    assert_eq!(v.as_int(), Some(2));
    del(&Value::Null, "a");
  }

  #[test]
  fn set_by_index_goes_through_the_splice_path() {
    let list = List::from_values(vec![Value::from(1), Value::from(2)]);
    let state = Value::from(list.clone());
    observe(&state, false);

    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let l = list.clone();
    let _w = watch(
      move || l.get(0).unwrap_or_default(),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { sync: true, ..Default::default() },
    );

    set(&state, 0usize, Value::from(9));
    assert_eq!(*hits.borrow(), 1);
    assert_eq!(list.get(0).and_then(|v| v.as_int()), Some(9));

    // Beyond-end index pads with nulls.
    set(&state, 4usize, Value::from(7));
    assert_eq!(list.len(), 5);
    assert!(list.get(3).unwrap().is_null());
    assert_eq!(list.get(4).and_then(|v| v.as_int()), Some(7));
  }
}
