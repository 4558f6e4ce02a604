//! # Types
//!
//! The call-stack data model.
//!
//! Every type here is a plain value owned by the tree or diagnostic that
//! contains it. Nothing is mutated in place: symbolication builds a new tree.

pub mod binary;
pub mod frame;
pub mod stack;
pub mod symbols;

// Re-export all public types
pub use binary::{AddressingMode, Binary};
pub use frame::{Frame, SIMULATED_BINARY_NAME};
pub use stack::{CallStack, CallStackTree};
pub use symbols::SymbolInfo;
