//! Prelude module for convenient imports
//!
//! Re-exports the whole public surface: the value model, the observation
//! entry points, watchers, and the update-queue contract.

// Value model
pub use crate::value::Value;
// Containers
pub use crate::{list::List, map::Map};
// Observation entry points
pub use crate::observe::{del, mark_raw, observe, set, toggle_observing, Key, Observed};
// Dependency subjects and the evaluation context
pub use crate::{context::current as current_target, subject::Subject};
// Watchers
pub use crate::watcher::{watch, Scope, WatchOptions, Watcher};
// Update queue
pub use crate::scheduler::{install_queue, uninstall_queue, BatchQueue, UpdateQueue};
// Errors & global switches
pub use crate::{
  config::{is_async, is_server_rendering, set_async, set_server_rendering_check},
  error::{clear_error_hook, set_error_hook, BoxError, Error},
  traverse::traverse,
};
