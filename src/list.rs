//! Observed sequence container.
//!
//! A `List` exposes only intercepted mutators; there is no raw index
//! assignment. Every mutation observes freshly inserted elements and
//! notifies the list's shape subject, which is the one subject covering the
//! whole sequence: per-index interception does not exist, replacement goes
//! through [`List::splice`] or the `set` entry point.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::{
  context,
  observe::{observe, Observed},
  rc::{MutRc, RcDeref, RcDerefMut},
  value::Value,
};

#[derive(Default)]
pub(crate) struct ListData {
  items: Vec<Value>,
  observed: Option<Observed>,
  raw: bool,
}

/// Cheap-clone handle to a shared sequence.
#[derive(Clone, Default)]
pub struct List {
  data: MutRc<ListData>,
}

impl List {
  pub fn new() -> Self { Self::default() }

  pub fn from_values(items: Vec<Value>) -> Self {
    let list = List::new();
    list.data.rc_deref_mut().items = items;
    list
  }

  #[inline]
  pub fn ptr_eq(&self, other: &List) -> bool { self.data.ptr_eq(&other.data) }

  #[inline]
  pub(crate) fn ptr_id(&self) -> usize { self.data.ptr_id() }

  pub fn observed(&self) -> Option<Observed> { self.data.rc_deref().observed.clone() }

  pub fn len(&self) -> usize {
    self.depend_shape();
    self.data.rc_deref().items.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn get(&self, index: usize) -> Option<Value> {
    self.depend_shape();
    let value = self.data.rc_deref().items.get(index).cloned()?;
    if context::is_tracking() {
      if let Some(child) = value.observed() {
        child.dep().depend();
      }
    }
    Some(value)
  }

  /// Snapshot of the elements. Registers on the shape subject only; deep
  /// registration is the reader's (or the deep traversal's) job.
  pub fn to_vec(&self) -> Vec<Value> {
    self.depend_shape();
    self.data.rc_deref().items.clone()
  }

  pub fn push(&self, value: Value) { self.splice(usize::MAX, 0, [value]); }

  pub fn unshift(&self, value: Value) { self.splice(0, 0, [value]); }

  pub fn pop(&self) -> Option<Value> {
    let len = self.data.rc_deref().items.len();
    if len == 0 {
      return None;
    }
    self.splice(len - 1, 1, []).pop()
  }

  pub fn shift(&self) -> Option<Value> {
    if self.data.rc_deref().items.is_empty() {
      return None;
    }
    self.splice(0, 1, []).pop()
  }

  pub fn insert(&self, index: usize, value: Value) { self.splice(index, 0, [value]); }

  pub fn remove(&self, index: usize) -> Option<Value> {
    if index >= self.data.rc_deref().items.len() {
      return None;
    }
    self.splice(index, 1, []).pop()
  }

  /// Replace `delete_count` elements starting at `start` (both clamped)
  /// with `replacements`, returning the removed elements. This is the one
  /// write path every other mutator funnels through: inserted elements are
  /// observed, then the shape subject is notified once.
  pub fn splice(
    &self,
    start: usize,
    delete_count: usize,
    replacements: impl IntoIterator<Item = Value>,
  ) -> Vec<Value> {
    let (removed, inserted, shape) = {
      let mut data = self.data.rc_deref_mut();
      let data = &mut *data;
      let len = data.items.len();
      let start = start.min(len);
      let delete_count = delete_count.min(len - start);
      let inserted: Vec<Value> = replacements.into_iter().collect();
      if delete_count == 0 && inserted.is_empty() {
        return Vec::new();
      }
      let removed: Vec<Value> = data
        .items
        .splice(start..start + delete_count, inserted.iter().cloned())
        .collect();
      (removed, inserted, data.observed.as_ref().map(|ob| ob.dep().clone()))
    };
    if shape.is_some() {
      for value in &inserted {
        observe(value, false);
      }
    }
    if let Some(dep) = shape {
      dep.notify();
    }
    removed
  }

  /// Insert-or-replace by index: replaces in place within bounds, pads
  /// with nulls beyond the end. Always routes through [`List::splice`].
  pub fn set_index(&self, index: usize, value: Value) {
    let len = self.data.rc_deref().items.len();
    if index < len {
      self.splice(index, 1, [value]);
    } else {
      let mut tail = vec![Value::Null; index - len];
      tail.push(value);
      self.splice(len, 0, tail);
    }
  }

  pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) {
    // The comparator is host code: sort on a detached buffer so it can
    // read reactive state without hitting an outstanding borrow.
    let mut items = std::mem::take(&mut self.data.rc_deref_mut().items);
    items.sort_by(&mut compare);
    let shape = {
      let mut data = self.data.rc_deref_mut();
      data.items = items;
      data.observed.as_ref().map(|ob| ob.dep().clone())
    };
    if let Some(dep) = shape {
      dep.notify();
    }
  }

  pub fn reverse(&self) {
    let shape = {
      let mut data = self.data.rc_deref_mut();
      data.items.reverse();
      data.observed.as_ref().map(|ob| ob.dep().clone())
    };
    if let Some(dep) = shape {
      dep.notify();
    }
  }

  pub fn clear(&self) { self.splice(0, usize::MAX, []); }

  fn depend_shape(&self) {
    if context::is_tracking() {
      if let Some(ob) = self.observed() {
        ob.dep().depend();
      }
    }
  }

  /// Register the current watcher on every observed element, recursing
  /// into nested sequences. `seen` carries container identities so a
  /// self-referencing sequence terminates.
  pub(crate) fn depend_elements(&self, seen: &mut FxHashSet<usize>) {
    if !seen.insert(self.ptr_id()) {
      return;
    }
    let items = self.data.rc_deref().items.clone();
    for item in &items {
      if let Some(ob) = item.observed() {
        ob.dep().depend();
      }
      if let Value::List(nested) = item {
        nested.depend_elements(seen);
      }
    }
  }

  pub(crate) fn set_raw(&self) {
    let mut data = self.data.rc_deref_mut();
    if data.observed.is_some() {
      tracing::warn!("cannot mark an already-observed list as raw");
      return;
    }
    data.raw = true;
  }

  pub(crate) fn ensure_observed(&self) -> Option<Observed> {
    {
      let data = self.data.rc_deref();
      if let Some(ob) = &data.observed {
        return Some(ob.clone());
      }
      if data.raw {
        return None;
      }
    }
    if !crate::observe::is_observing() || crate::config::is_server_rendering() {
      return None;
    }
    let ob = Observed::new();
    let children: Vec<Value> = {
      let mut data = self.data.rc_deref_mut();
      data.observed = Some(ob.clone());
      data.items.clone()
    };
    for child in children {
      observe(&child, false);
    }
    Some(ob)
  }
}

impl FromIterator<Value> for List {
  fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
    List::from_values(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;
  use crate::{
    map::Map,
    watcher::{watch, WatchOptions},
  };

  fn observed_list(items: Vec<Value>) -> List {
    let list = List::from_values(items);
    observe(&Value::from(list.clone()), false);
    list
  }

  fn shape_counter(list: &List) -> (Rc<RefCell<i32>>, crate::watcher::Watcher) {
    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let l = list.clone();
    let w = watch(
      move || Value::from(l.len() as i64),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { deep: false, sync: true, ..Default::default() },
    );
    (hits, w)
  }

  #[test]
  fn mutators_notify_the_shape_subject() {
    let list = observed_list(vec![Value::from(1)]);
    let (hits, _w) = shape_counter(&list);

    list.push(Value::from(2));
    assert_eq!(*hits.borrow(), 1);
    list.unshift(Value::from(0));
    assert_eq!(*hits.borrow(), 2);
    assert_eq!(list.pop().and_then(|v| v.as_int()), Some(2));
    assert_eq!(*hits.borrow(), 3);
    assert_eq!(list.shift().and_then(|v| v.as_int()), Some(0));
    assert_eq!(*hits.borrow(), 4);
  }

  #[test]
  fn noop_mutations_do_not_notify() {
    let list = observed_list(vec![]);
    let (hits, _w) = shape_counter(&list);

    assert!(list.pop().is_none());
    assert!(list.shift().is_none());
    assert!(list.remove(3).is_none());
    assert!(list.splice(0, 0, []).is_empty());
    assert_eq!(*hits.borrow(), 0);
  }

  #[test]
  fn splice_replaces_and_returns_removed() {
    let list = observed_list(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let removed = list.splice(1, 1, [Value::from(20), Value::from(21)]);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].as_int(), Some(2));
    let ints: Vec<_> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(ints, vec![1, 20, 21, 3]);
  }

  #[test]
  fn inserted_elements_become_observed() {
    let list = observed_list(vec![]);
    let child = Map::from_pairs([("x", Value::from(1))]);
    list.push(Value::from(child.clone()));
    assert!(child.observed().is_some());
  }

  #[test]
  fn sort_and_reverse_notify() {
    let list = observed_list(vec![Value::from(3), Value::from(1), Value::from(2)]);
    let (hits, _w) = shape_counter(&list);

    list.sort_by(|a, b| a.as_int().cmp(&b.as_int()));
    let ints: Vec<_> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(ints, vec![1, 2, 3]);
    assert_eq!(*hits.borrow(), 1);

    list.reverse();
    let ints: Vec<_> = list.to_vec().iter().map(|v| v.as_int().unwrap()).collect();
    assert_eq!(ints, vec![3, 2, 1]);
    assert_eq!(*hits.borrow(), 2);
  }

  #[test]
  fn element_reads_track_element_containers() {
    let child = Map::from_pairs([("x", Value::from(1))]);
    let list = observed_list(vec![Value::from(child.clone())]);

    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let l = list.clone();
    let _w = watch(
      move || l.get(0).unwrap_or_default(),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { sync: true, ..Default::default() },
    );

    // Shape change of the element container reaches the reader.
    crate::observe::set(&Value::from(child), "y", Value::from(2));
    assert_eq!(*hits.borrow(), 1);
  }

  #[test]
  fn self_containing_list_terminates() {
    let list = List::new();
    list.push(Value::from(list.clone()));
    let state = Value::from(list.clone());
    assert!(observe(&state, false).is_some());

    let hits = Rc::new(RefCell::new(0));
    let c_hits = hits.clone();
    let l = list.clone();
    let _w = watch(
      move || l.get(0).unwrap_or_default(),
      move |_, _| *c_hits.borrow_mut() += 1,
      WatchOptions { sync: true, ..Default::default() },
    );
    list.push(Value::from(1));
    assert_eq!(*hits.borrow(), 1);
  }
}
