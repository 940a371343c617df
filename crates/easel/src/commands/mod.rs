//! CLI subcommands.

pub mod parse;
pub mod render;
