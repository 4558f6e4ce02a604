//! # Symbol Resolvers
//!
//! The symbolication engine never looks at images itself. It derives a
//! [`SymbolicationTarget`] per frame and hands the address to a
//! [`SymbolResolver`]. Everything platform specific lives behind that trait.
//!
//! Two backends ship with the crate:
//!
//! - [`DwarfResolver`]: on-disk images read with `object`, DWARF line tables
//!   through `addr2line`, symbol-table fallback
//! - [`DladdrResolver`] (unix only): in-process lookup with `dladdr(3)`
//!
//! A resolver that cannot place an address returns an empty list. That is a
//! valid "unresolved" answer, not an error.
//!
//! ## Example
//!
//! ```rust
//! use symtree_core::resolver::{FnResolver, SymbolResolver, SymbolicationTarget};
//! use symtree_core::types::SymbolInfo;
//! use uuid::Uuid;
//!
//! let resolver = FnResolver::new(|address, target: &SymbolicationTarget| {
//!     vec![SymbolInfo::new("main").with_offset(address - target.load_address)]
//! });
//!
//! let target = SymbolicationTarget::new(Uuid::nil(), 0x1000, None);
//! let symbols = resolver.resolve(0x1010, &target);
//! assert_eq!(symbols[0].offset, Some(0x10));
//! ```

mod demangle;
#[cfg(unix)]
pub mod dladdr;
pub mod dwarf;
pub mod lookup;

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

pub use demangle::demangle_symbol;
#[cfg(unix)]
pub use dladdr::DladdrResolver;
pub use dwarf::DwarfResolver;
pub use lookup::{ImageLookup, LoadedImage, StaticImageLookup};
use uuid::Uuid;

use crate::types::{Binary, SymbolInfo};

/// Query key handed to a resolver for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolicationTarget
{
    pub binary_id: Uuid,
    /// Load address of the image, already reconciled for the diagnostic's OS.
    pub load_address: u64,
    /// Image name or path as reported by the payload.
    pub path: Option<String>,
}

impl SymbolicationTarget
{
    pub fn new(binary_id: Uuid, load_address: u64, path: Option<String>) -> Self
    {
        Self {
            binary_id,
            load_address,
            path,
        }
    }

    /// Offset of `address` from the image's load address.
    ///
    /// `None` when the address lies below the load address.
    #[must_use]
    pub fn relative_address(&self, address: u64) -> Option<u64>
    {
        address.checked_sub(self.load_address)
    }
}

impl From<Binary> for SymbolicationTarget
{
    fn from(binary: Binary) -> Self
    {
        Self::new(binary.id, binary.load_address, binary.name)
    }
}

/// Maps an address inside an identified image to symbols.
///
/// Implementations may be slow (file parsing, process introspection) and may
/// cache whatever they like. Callers make one call per frame and keep nothing.
///
/// The first returned entry is the primary symbol. Resolvers that understand
/// inlining return the innermost inlined function first.
pub trait SymbolResolver
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>;
}

impl<R> SymbolResolver for &R
where
    R: SymbolResolver + ?Sized,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        (**self).resolve(address, target)
    }
}

impl<R> SymbolResolver for Box<R>
where
    R: SymbolResolver + ?Sized,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        (**self).resolve(address, target)
    }
}

impl<R> SymbolResolver for Arc<R>
where
    R: SymbolResolver + ?Sized,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        (**self).resolve(address, target)
    }
}

impl<R> SymbolResolver for Rc<R>
where
    R: SymbolResolver + ?Sized,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        (**self).resolve(address, target)
    }
}

/// Resolver backed by a closure.
pub struct FnResolver<F>
{
    resolve: F,
}

impl<F> FnResolver<F>
where
    F: Fn(u64, &SymbolicationTarget) -> Vec<SymbolInfo>,
{
    pub fn new(resolve: F) -> Self
    {
        Self { resolve }
    }
}

impl<F> SymbolResolver for FnResolver<F>
where
    F: Fn(u64, &SymbolicationTarget) -> Vec<SymbolInfo>,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        (self.resolve)(address, target)
    }
}

impl<F> fmt::Debug for FnResolver<F>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

/// Resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl SymbolResolver for NullResolver
{
    fn resolve(&self, _address: u64, _target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        Vec::new()
    }
}
