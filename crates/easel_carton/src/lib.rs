//! Carton - The artist's toolbox for Easel.
//!
//! This crate provides the foundational utilities shared by every Easel crate:
//! string and collection types, content hashing, and the reactive value
//! primitive that the rest of the runtime builds on.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use easel_carton::live;
//!
//! let count = live(0);
//! let seen = Rc::new(Cell::new(0));
//! let sink = seen.clone();
//! count.subscribe(Rc::new(move |_prev: &i32, next: &i32| sink.set(*next)));
//!
//! count.set(3);
//! assert_eq!(seen.get(), 3);
//! assert_eq!(count.get(), 3);
//! ```

pub mod dom_tag_config;
pub mod hash;
pub mod live;

pub use dom_tag_config::is_void_tag;
pub use live::{live, live_with, Live, Subscriber};

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export once_cell for lazily built statics (regex tables)
pub use once_cell::sync::Lazy;
