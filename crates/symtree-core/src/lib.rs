//! # symtree-core
//!
//! Call-stack tree model and symbolication engine for crash, hang, CPU and
//! disk-write exception diagnostics.
//!
//! This crate provides:
//! - The wire model: frames, call stacks, call stack trees, diagnostics and
//!   payloads, decoded and encoded with `serde`
//! - Binary identity derivation and per-tree binary image aggregation
//! - Load-address reconciliation from a diagnostic's OS version string
//! - A symbolication engine parameterised by a [`resolver::SymbolResolver`]
//! - Resolver backends for on-disk images (DWARF / symbol tables) and, on
//!   unix, the running process (`dladdr`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use symtree_core::prelude::*;
//!
//! fn main() -> symtree_core::Result<()>
//! {
//!     let data = std::fs::read("payload.json")?;
//!     let payload = DiagnosticPayload::from_json(&data)?;
//!
//!     let mut resolver = DwarfResolver::new();
//!     resolver.add_image("MyApp.dSYM/Contents/Resources/DWARF/MyApp")?;
//!
//!     let engine = SymbolicationEngine::new(resolver);
//!     let symbolicated = engine.symbolicate_payload(&payload);
//!     println!("{}", String::from_utf8_lossy(&symbolicated.to_json_pretty()?));
//!     Ok(())
//! }
//! ```
//!
//! ## Why unsafe code is needed
//!
//! The in-process resolver calls `dladdr(3)`, which takes a raw pointer and
//! fills a C struct. The call is wrapped in a safe API; nothing else in the
//! crate uses `unsafe`.

#![allow(unsafe_code)] // Required for dladdr(3)

pub mod aggregate;
pub mod diagnostic;
pub mod error;
mod nesting;
pub mod prelude;
pub mod reconcile;
pub mod resolver;
pub mod symbolication;
pub mod types;

pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticPayload};
// Re-export commonly used types
pub use error::{Result, SymtreeError};
pub use symbolication::SymbolicationEngine;
pub use types::{AddressingMode, Binary, CallStack, CallStackTree, Frame, SymbolInfo};
