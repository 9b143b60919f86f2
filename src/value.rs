//! Dynamic value model.
//!
//! Observed state is a tree of [`Value`]s. Primitives are stored inline;
//! containers ([`Map`], [`List`]) are cheap-clone handles to shared payloads,
//! so cloning a `Value` shares the container the way a reference-semantics
//! host would. A container can reach itself; every algorithm that walks
//! values must tolerate cycles.
//!
//! Two equality rules live here and they are deliberately different:
//!
//! - [`Value::same`] is strict equality: primitives by value, containers by
//!   pointer identity. `Float` uses `f64` equality, so `NaN` is not `same` as
//!   `NaN`. This is the rule re-run comparison wants.
//! - [`Value::same_for_write`] extends `same` to treat two NaNs as equal, so
//!   overwriting a NaN slot with NaN is a no-op instead of a notification.

use std::{fmt, rc::Rc};

use crate::{list::List, map::Map, observe::Observed};

#[derive(Clone, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(Rc<str>),
  Map(Map),
  List(List),
}

impl Value {
  pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

  pub fn is_container(&self) -> bool { matches!(self, Value::Map(_) | Value::List(_)) }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_float(&self) -> Option<f64> {
    match self {
      Value::Float(f) => Some(*f),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&Map> {
    match self {
      Value::Map(m) => Some(m),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&List> {
    match self {
      Value::List(l) => Some(l),
      _ => None,
    }
  }

  /// The observation record attached to this value, if it is an observed
  /// container.
  pub fn observed(&self) -> Option<Observed> {
    match self {
      Value::Map(m) => m.observed(),
      Value::List(l) => l.observed(),
      _ => None,
    }
  }

  /// Strict equality: primitives by value (`Str` by content), containers by
  /// pointer identity. `NaN` is not `same` as `NaN`.
  pub fn same(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
      (Value::List(a), Value::List(b)) => a.ptr_eq(b),
      _ => false,
    }
  }

  /// Write equality: [`Value::same`], except two NaNs count as equal. The
  /// setter uses this so a NaN-over-NaN write does not notify.
  pub fn same_for_write(&self, other: &Value) -> bool {
    if let (Value::Float(a), Value::Float(b)) = (self, other) {
      if a.is_nan() && b.is_nan() {
        return true;
      }
    }
    self.same(other)
  }

  pub(crate) fn type_name(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::Str(_) => "str",
      Value::Map(_) => "map",
      Value::List(_) => "list",
    }
  }
}

// Containers print by identity, not content: observed values may be cyclic
// and a structural Debug would never terminate on them.
impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "Null"),
      Value::Bool(b) => write!(f, "Bool({b})"),
      Value::Int(i) => write!(f, "Int({i})"),
      Value::Float(v) => write!(f, "Float({v})"),
      Value::Str(s) => write!(f, "Str({s:?})"),
      Value::Map(m) => write!(f, "Map(@{:x})", m.ptr_id()),
      Value::List(l) => write!(f, "List(@{:x})", l.ptr_id()),
    }
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Value::Int(v as i64) }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Str(Rc::from(v)) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Str(Rc::from(v.as_str())) }
}

impl From<Map> for Value {
  fn from(v: Map) -> Self { Value::Map(v) }
}

impl From<List> for Value {
  fn from(v: List) -> Self { Value::List(v) }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn primitives_compare_by_value() {
    assert!(Value::from(1).same(&Value::from(1)));
    assert!(!Value::from(1).same(&Value::from(2)));
    assert!(Value::from("a").same(&Value::from("a")));
    assert!(!Value::from("a").same(&Value::from("b")));
    assert!(Value::Null.same(&Value::Null));
    assert!(!Value::from(1).same(&Value::from(1.0)));
  }

  #[test]
  fn containers_compare_by_identity() {
    let m = Map::new();
    let a = Value::from(m.clone());
    let b = Value::from(m);
    assert!(a.same(&b));
    assert!(!a.same(&Value::from(Map::new())));

    let l = List::new();
    assert!(Value::from(l.clone()).same(&Value::from(l)));
    assert!(!Value::from(List::new()).same(&Value::from(List::new())));
  }

  #[test]
  fn nan_is_not_same_but_is_same_for_write() {
    let nan = Value::from(f64::NAN);
    assert!(!nan.same(&nan.clone()));
    assert!(nan.same_for_write(&Value::from(f64::NAN)));
    assert!(!nan.same_for_write(&Value::from(0.0)));
  }

  proptest! {
    #[test]
    fn int_same_is_reflexive(v: i64) {
      prop_assert!(Value::from(v).same(&Value::from(v)));
    }

    #[test]
    fn float_write_equality_is_reflexive(v: f64) {
      // `same` is reflexive only for non-NaN floats; `same_for_write` always.
      prop_assert!(Value::from(v).same_for_write(&Value::from(v)));
      prop_assert_eq!(Value::from(v).same(&Value::from(v)), !v.is_nan());
    }

    #[test]
    fn str_same_matches_content(a in ".*", b in ".*") {
      let equal = a == b;
      prop_assert_eq!(Value::from(a).same(&Value::from(b)), equal);
    }
  }
}
