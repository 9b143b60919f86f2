//! Deep traversal: touch every reachable slot of a value.
//!
//! Used by `deep` watchers after evaluation. Every read goes through the
//! tracked paths, so the traversal's only effect is dependency
//! registration on each nested subject. A seen-set of container identities
//! makes cyclic values terminate.

use rustc_hash::FxHashSet;

use crate::value::Value;

pub fn traverse(value: &Value) {
  let mut seen = FxHashSet::default();
  traverse_value(value, &mut seen);
}

fn traverse_value(value: &Value, seen: &mut FxHashSet<usize>) {
  match value {
    Value::Map(map) => {
      if !seen.insert(map.ptr_id()) {
        return;
      }
      for key in map.keys() {
        if let Some(child) = map.get(&key) {
          traverse_value(&child, seen);
        }
      }
    }
    Value::List(list) => {
      if !seen.insert(list.ptr_id()) {
        return;
      }
      for item in list.to_vec() {
        traverse_value(&item, seen);
      }
    }
    _ => {}
  }
}
