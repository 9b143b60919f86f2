//! # rxstate: fine-grained reactive state
//!
//! Plain dynamic values become observable state: computations discover the
//! slots they read while they run, and a mutation notifies exactly the
//! computations that read the mutated slot, with no subscription API on the
//! reading side at all.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxstate::prelude::*;
//!
//! let map = Map::from_pairs([("count", Value::from(0))]);
//! observe(&Value::from(map.clone()), true);
//!
//! let source = map.clone();
//! let w = watch(
//!   move || source.get("count").unwrap_or_default(),
//!   |new, old| println!("{old:?} -> {new:?}"),
//!   WatchOptions { sync: true, ..Default::default() },
//! );
//!
//! map.set("count", Value::from(1)); // prints: Int(0) -> Int(1)
//! w.teardown();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Value`] / [`Map`] / [`List`] | Dynamic value tree; containers are shared handles |
//! | [`observe`] | Installs interception on a container and everything it reaches |
//! | [`Subject`] | Notification hub for one observable slot |
//! | [`Watcher`] | A computation that re-runs when its dependencies change |
//! | [`BatchQueue`] | Reference batched update queue (dedupe, ascending flush) |
//!
//! Shape changes (keys a record never declared) cannot be intercepted by
//! a per-key cell and go through [`set`]/[`del`], which notify the
//! container's shape subject instead.
//!
//! The engine is single-threaded and cooperative: at most one watcher
//! evaluates at a time, enforced by a thread-local evaluation stack. None
//! of the handle types are `Send`.
//!
//! [`Value`]: prelude::Value
//! [`Map`]: prelude::Map
//! [`List`]: prelude::List
//! [`observe`]: prelude::observe
//! [`set`]: prelude::set
//! [`del`]: prelude::del
//! [`Subject`]: prelude::Subject
//! [`Watcher`]: prelude::Watcher
//! [`BatchQueue`]: prelude::BatchQueue

pub mod config;
pub mod context;
pub mod error;
pub mod list;
pub mod map;
pub mod observe;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod traverse;
pub mod value;
pub mod watcher;

// Re-export the prelude module
pub use prelude::*;
