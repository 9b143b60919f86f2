//! Global switches consulted by the engine.

use std::cell::Cell;

use once_cell::sync::OnceCell;

thread_local! {
  static ASYNC_MODE: Cell<bool> = const { Cell::new(true) };
}

/// Host-installed probe for "rendering in a non-interactive, write-once
/// context". Set once at startup; observation is skipped entirely while it
/// returns true.
static SERVER_RENDERING_CHECK: OnceCell<fn() -> bool> = OnceCell::new();

/// Whether notifications are expected to flow through a batched update
/// queue (the default). When turned off, subjects sort their subscriber
/// snapshot by ascending identifier before dispatching inline, since no
/// queue will do it for them.
pub fn is_async() -> bool { ASYNC_MODE.with(|m| m.get()) }

pub fn set_async(on: bool) { ASYNC_MODE.with(|m| m.set(on)) }

pub fn set_server_rendering_check(check: fn() -> bool) {
  if SERVER_RENDERING_CHECK.set(check).is_err() {
    tracing::warn!("server-rendering check is already installed; ignoring");
  }
}

pub fn is_server_rendering() -> bool {
  SERVER_RENDERING_CHECK.get().map_or(false, |check| check())
}
