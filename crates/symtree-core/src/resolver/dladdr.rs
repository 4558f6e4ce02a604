//! In-process symbol resolution through `dladdr(3)`.
//!
//! Only useful when the payload was produced by the running process (for
//! example an exception backtrace captured before a crash): the payload's
//! load address is replaced by the live image's load address and the rebased
//! address is handed to the dynamic linker.

use std::ffi::{c_void, CStr};
use std::mem::MaybeUninit;

use tracing::trace;

use super::lookup::ImageLookup;
use super::{demangle_symbol, SymbolResolver, SymbolicationTarget};
use crate::types::SymbolInfo;

/// Resolves addresses in images mapped into the current process.
///
/// Only dynamic symbols are visible to `dladdr`, so statically linked or
/// stripped functions come back unresolved.
#[derive(Debug, Clone)]
pub struct DladdrResolver<L>
{
    images: L,
}

impl<L> DladdrResolver<L>
where
    L: ImageLookup,
{
    pub fn new(images: L) -> Self
    {
        Self { images }
    }

    pub fn images(&self) -> &L
    {
        &self.images
    }

    /// Rebase `address` from the payload's image onto the live image.
    fn process_address(&self, address: u64, target: &SymbolicationTarget) -> Option<usize>
    {
        let image = self.images.image_with_id(target.binary_id)?;
        let relative = target.relative_address(address)?;
        let live = image.load_address.checked_add(relative)?;
        usize::try_from(live).ok()
    }
}

impl<L> SymbolResolver for DladdrResolver<L>
where
    L: ImageLookup,
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        let Some(process_address) = self.process_address(address, target) else {
            trace!(address, binary_id = %target.binary_id, "address not mappable into this process");
            return Vec::new();
        };

        lookup(process_address).into_iter().collect()
    }
}

fn lookup(process_address: usize) -> Option<SymbolInfo>
{
    let mut info = MaybeUninit::<libc::Dl_info>::zeroed();

    // SAFETY: dladdr only inspects the address value and fills `info`.
    let found = unsafe { libc::dladdr(process_address as *const c_void, info.as_mut_ptr()) };
    if found == 0 {
        return None;
    }

    // SAFETY: dladdr returned non-zero, so `info` has been written.
    let info = unsafe { info.assume_init() };
    if info.dli_sname.is_null() {
        return None;
    }

    // SAFETY: dli_sname is a NUL-terminated string owned by the dynamic linker.
    let name = unsafe { CStr::from_ptr(info.dli_sname) }.to_string_lossy().into_owned();
    let offset = process_address.checked_sub(info.dli_saddr as usize)?;

    let mut symbol = SymbolInfo::new(name.as_str()).with_offset(offset as u64);
    if let Some(demangled) = demangle_symbol(&name) {
        symbol = symbol.with_demangled(demangled);
    }
    Some(symbol)
}
