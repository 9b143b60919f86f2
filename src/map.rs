//! Observed record container.
//!
//! A `Map` is an insertion-ordered record of `String` keys. Once observed,
//! every key owns a reactive cell (the stored value plus one subject) and
//! reads/writes go through the registration/notify protocol. Unobserved
//! maps behave as plain data.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::{
  context,
  observe::{observe, Observed},
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::Subject,
  value::Value,
};

pub(crate) struct MapEntry {
  value: Value,
  dep: Option<Subject>,
}

#[derive(Default)]
pub(crate) struct MapData {
  entries: IndexMap<String, MapEntry>,
  observed: Option<Observed>,
  raw: bool,
}

/// Cheap-clone handle to a shared record.
#[derive(Clone, Default)]
pub struct Map {
  data: MutRc<MapData>,
}

enum WriteOutcome {
  Unchanged,
  Replaced { dep: Option<Subject>, reobserve: bool },
  Added { shape: Subject },
  AddedPlain,
  Refused,
}

impl Map {
  pub fn new() -> Self { Self::default() }

  pub fn from_pairs<K, I>(pairs: I) -> Self
  where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
  {
    let map = Map::new();
    {
      let mut data = map.data.rc_deref_mut();
      for (key, value) in pairs {
        data.entries.insert(key.into(), MapEntry { value, dep: None });
      }
    }
    map
  }

  #[inline]
  pub fn ptr_eq(&self, other: &Map) -> bool { self.data.ptr_eq(&other.data) }

  #[inline]
  pub(crate) fn ptr_id(&self) -> usize { self.data.ptr_id() }

  pub fn observed(&self) -> Option<Observed> { self.data.rc_deref().observed.clone() }

  /// Read a key. While a watcher is evaluating, this registers it on the
  /// key's subject; a container value additionally registers its shape
  /// subject, and a sequence value registers every observed element:
  /// index reads cannot be intercepted, so touching the elements here is
  /// what subscribes the watcher to their mutations.
  pub fn get(&self, key: &str) -> Option<Value> {
    let (value, dep) = {
      let data = self.data.rc_deref();
      let entry = data.entries.get(key)?;
      (entry.value.clone(), entry.dep.clone())
    };
    if context::is_tracking() {
      if let Some(dep) = dep {
        dep.depend();
        if let Some(child) = value.observed() {
          child.dep().depend();
          if let Value::List(list) = &value {
            list.depend_elements(&mut FxHashSet::default());
          }
        }
      }
    }
    Some(value)
  }

  /// Write a key.
  ///
  /// An existing key is a reactive write: no-op when the new value is
  /// write-equal to the old (NaN over NaN included), otherwise store,
  /// re-observe the new value and notify the key's subject. A new key on an
  /// observed map installs a fresh reactive cell and notifies the shape
  /// subject; on a root-state owner it is refused with a warning.
  pub fn set(&self, key: impl Into<String>, value: Value) {
    let key = key.into();
    let outcome = {
      let mut data = self.data.rc_deref_mut();
      let data = &mut *data;
      if let Some(entry) = data.entries.get_mut(&key) {
        if entry.value.same_for_write(&value) {
          WriteOutcome::Unchanged
        } else {
          entry.value = value.clone();
          WriteOutcome::Replaced {
            dep: entry.dep.clone(),
            reobserve: data.observed.is_some(),
          }
        }
      } else {
        match &data.observed {
          Some(ob) if ob.root_count() > 0 => WriteOutcome::Refused,
          Some(ob) => {
            data.entries.insert(key.clone(), MapEntry {
              value: value.clone(),
              dep: Some(Subject::new()),
            });
            WriteOutcome::Added { shape: ob.dep().clone() }
          }
          None => {
            data
              .entries
              .insert(key.clone(), MapEntry { value: value.clone(), dep: None });
            WriteOutcome::AddedPlain
          }
        }
      }
    };
    // Observation and notification run after the borrow is released: both
    // may re-enter this map through subscribers or self-referencing values.
    match outcome {
      WriteOutcome::Unchanged | WriteOutcome::AddedPlain => {}
      WriteOutcome::Replaced { dep, reobserve } => {
        if reobserve {
          observe(&value, false);
        }
        if let Some(dep) = dep {
          dep.notify();
        }
      }
      WriteOutcome::Added { shape } => {
        observe(&value, false);
        shape.notify();
      }
      WriteOutcome::Refused => {
        tracing::warn!(
          key = %key,
          "refusing to add a key to root state at runtime; declare it upfront"
        );
      }
    }
  }

  /// Remove a key and notify the shape subject. Refused on root-state
  /// owners; missing keys are a no-op.
  pub fn delete(&self, key: &str) {
    let shape = {
      let mut data = self.data.rc_deref_mut();
      let data = &mut *data;
      if let Some(ob) = &data.observed {
        if ob.root_count() > 0 {
          tracing::warn!(key = %key, "refusing to delete a key from root state at runtime");
          return;
        }
      }
      if data.entries.shift_remove(key).is_none() {
        return;
      }
      data.observed.as_ref().map(|ob| ob.dep().clone())
    };
    if let Some(dep) = shape {
      dep.notify();
    }
  }

  pub fn len(&self) -> usize {
    self.depend_shape();
    self.data.rc_deref().entries.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  pub fn contains_key(&self, key: &str) -> bool {
    self.depend_shape();
    self.data.rc_deref().entries.contains_key(key)
  }

  /// Keys in insertion order. Registers on the shape subject, so watchers
  /// enumerating keys re-run when the key set changes.
  pub fn keys(&self) -> Vec<String> {
    self.depend_shape();
    self.data.rc_deref().entries.keys().cloned().collect()
  }

  fn depend_shape(&self) {
    if context::is_tracking() {
      if let Some(ob) = self.observed() {
        ob.dep().depend();
      }
    }
  }

  pub(crate) fn set_raw(&self) {
    let mut data = self.data.rc_deref_mut();
    if data.observed.is_some() {
      tracing::warn!("cannot mark an already-observed map as raw");
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
      for entry in data.entries.values_mut() {
        entry.dep = Some(Subject::new());
      }
      data.entries.values().map(|e| e.value.clone()).collect()
    };
    // Recurse outside the borrow: a child may be this very map.
    for child in children {
      observe(&child, false);
    }
    Some(ob)
  }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
  fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self { Map::from_pairs(iter) }
}
