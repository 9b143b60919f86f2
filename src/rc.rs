//! Shared-mutable pointer used by observed containers.
//!
//! The engine is single-threaded by contract, so one pointer type is enough:
//! `MutRc<T>` is an `Rc<RefCell<T>>` behind a pair of access traits. Handles
//! are cheap to clone and two handles to the same payload compare equal by
//! pointer identity, which is exactly the identity rule the value model needs.

use std::{
  cell::{Ref, RefCell, RefMut},
  rc::Rc,
};

pub trait RcDeref {
  type Target<'a>
  where
    Self: 'a;
  fn rc_deref(&self) -> Self::Target<'_>;
}

pub trait RcDerefMut {
  type Target<'a>
  where
    Self: 'a;
  fn rc_deref_mut(&self) -> Self::Target<'_>;
}

#[derive(Default)]
pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }

  /// Stable address of the payload, used as the container identity.
  #[inline]
  pub fn ptr_id(&self) -> usize { Rc::as_ptr(&self.0) as *const () as usize }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl<T> RcDeref for MutRc<T> {
  type Target<'a>
    = Ref<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref(&self) -> Self::Target<'_> { self.0.borrow() }
}

impl<T> RcDerefMut for MutRc<T> {
  type Target<'a>
    = RefMut<'a, T>
  where
    Self: 'a;

  #[inline]
  fn rc_deref_mut(&self) -> Self::Target<'_> { self.0.borrow_mut() }
}

impl<T> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}
