//! # easel_croquis
//!
//! Croquis - The reactive binding pass for Easel.
//!
//! ## Name Origin
//!
//! **Croquis** (/kʁɔ.ki/) is a French term for a quick, sketchy drawing that
//! captures the essential features of a subject. `easel_croquis` sketches the
//! live parts of a template: the `{{ }}` placeholders whose text follows a
//! reactive value.
//!
//! ## Architecture
//!
//! ```text
//! easel_armature (Parse)
//!        ↓
//!   easel_relief (Tree)
//!        ↓
//!  easel_croquis (Binding)  ← This crate
//!        ↓
//!  easel_atelier (Lifecycle)
//! ```

pub mod binding;

pub use binding::{
    bind_placeholders, mark_placeholders, placeholder_key, placeholder_keys, render_value,
    split_placeholders, Bindings, RxMap, Segment, META_PLACEHOLDER,
};
