//! # Easel
//!
//! Web components from single-file documents.
//!
//! This crate re-exports all Easel sub-crates for unified documentation.
//!
//! ## Crates
//!
//! - [`carton`] - Shared utilities and the `Live` reactive value
//! - [`relief`] - Node tree and retained element surface
//! - [`armature`] - Markup tokenizer, tree builder and document blocks
//! - [`croquis`] - Placeholder analysis and binding
//! - [`atelier`] - Registry, extensions and instance lifecycle

/// Shared utilities and the `Live` reactive value.
pub use easel_carton as carton;

/// Node tree and retained element surface.
pub use easel_relief as relief;

/// Markup tokenizer, tree builder and document blocks.
pub use easel_armature as armature;

/// Placeholder analysis and binding.
pub use easel_croquis as croquis;

/// Registry, extensions and instance lifecycle.
pub use easel_atelier as atelier;
