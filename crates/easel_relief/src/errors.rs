//! Structural errors raised by node tree mutation.

use thiserror::Error;

/// A tree mutation that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("the reference node is not a child of this node")]
    NotAChild,
    #[error("the node has no parent")]
    Detached,
    #[error("text nodes cannot have children")]
    TextHasNoChildren,
    #[error("only text nodes carry a text payload")]
    NotText,
    #[error("inserting the node would create a cycle")]
    WouldCycle,
}

pub type TreeResult<T = ()> = std::result::Result<T, TreeError>;
