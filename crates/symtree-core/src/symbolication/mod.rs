//! # Symbolication Engine
//!
//! Rebuilds call stack trees with [`SymbolInfo`](crate::types::SymbolInfo) attached to every frame the
//! resolver can place.
//!
//! The engine is a pure tree transformation. It never mutates its input,
//! never caches resolver answers and has no failure mode:
//!
//! - every frame gets a fresh `symbol_info`, replacing any it arrived with
//! - a frame without binary identity, or one the resolver cannot place, gets
//!   an empty list
//! - every other field, including the `children` shape, is preserved
//!
//! The addressing mode is decided once per diagnostic from its own OS
//! version and used for every frame in that diagnostic's tree.
//!
//! ## Example
//!
//! ```rust
//! use symtree_core::resolver::{FnResolver, SymbolicationTarget};
//! use symtree_core::symbolication::SymbolicationEngine;
//! use symtree_core::types::{AddressingMode, CallStack, CallStackTree, Frame, SymbolInfo};
//! use uuid::Uuid;
//!
//! let resolver = FnResolver::new(|address, target: &SymbolicationTarget| {
//!     vec![SymbolInfo::new("main").with_offset(address - target.load_address)]
//! });
//! let engine = SymbolicationEngine::new(&resolver);
//!
//! let frame = Frame::new(1015).with_binary(Uuid::nil(), 15, None);
//! let tree = CallStackTree::new(vec![CallStack::new(Some(true), vec![frame])], true);
//!
//! let symbolicated = engine.symbolicate_tree(&tree, AddressingMode::Offset);
//! let symbol = symbolicated.call_stacks[0].root_frames[0].primary_symbol().unwrap();
//! assert_eq!(symbol.offset, Some(15));
//! ```

use tracing::{debug, trace};

use crate::diagnostic::{
    CpuExceptionDiagnostic,
    CrashDiagnostic,
    Diagnostic,
    DiagnosticDetails,
    DiagnosticPayload,
    DiskWriteExceptionDiagnostic,
    ExceptionInfo,
    HangDiagnostic,
};
use crate::nesting::with_stack;
use crate::reconcile::ReconciliationPolicy;
use crate::resolver::{SymbolResolver, SymbolicationTarget};
use crate::types::{AddressingMode, CallStack, CallStackTree, Frame};

impl Frame
{
    /// Resolver query for this frame, if it carries a binary identity.
    pub fn symbolication_target(&self, mode: AddressingMode) -> Option<SymbolicationTarget>
    {
        self.binary(mode).map(SymbolicationTarget::from)
    }
}

/// Applies a [`SymbolResolver`] to frames, trees, diagnostics and payloads.
#[derive(Debug, Clone)]
pub struct SymbolicationEngine<R>
{
    resolver: R,
    policy: ReconciliationPolicy,
}

impl<R> SymbolicationEngine<R>
where
    R: SymbolResolver,
{
    /// Engine using the default [`ReconciliationPolicy`].
    pub fn new(resolver: R) -> Self
    {
        Self::with_policy(resolver, ReconciliationPolicy::default())
    }

    pub fn with_policy(resolver: R, policy: ReconciliationPolicy) -> Self
    {
        Self { resolver, policy }
    }

    pub fn resolver(&self) -> &R
    {
        &self.resolver
    }

    pub fn policy(&self) -> &ReconciliationPolicy
    {
        &self.policy
    }

    /// Symbolicate `frame` and all of its descendants.
    pub fn symbolicate_frame(&self, frame: &Frame, mode: AddressingMode) -> Frame
    {
        let children = frame.children.as_ref().map(|children| {
            children
                .iter()
                .map(|child| with_stack(|| self.symbolicate_frame(child, mode)))
                .collect()
        });

        let symbols = match frame.symbolication_target(mode) {
            Some(target) => {
                let symbols = self.resolver.resolve(frame.address, &target);
                trace!(
                    address = frame.address,
                    binary_id = %target.binary_id,
                    load_address = target.load_address,
                    resolved = symbols.len(),
                    "symbolicated frame"
                );
                symbols
            }
            None => Vec::new(),
        };

        Frame {
            binary_id: frame.binary_id,
            binary_offset: frame.binary_offset,
            sample_count: frame.sample_count,
            binary_name: frame.binary_name.clone(),
            address: frame.address,
            children,
            symbol_info: Some(symbols),
        }
    }

    pub fn symbolicate_call_stack(&self, call_stack: &CallStack, mode: AddressingMode) -> CallStack
    {
        let root_frames = call_stack
            .root_frames
            .iter()
            .map(|frame| self.symbolicate_frame(frame, mode))
            .collect();

        CallStack::new(call_stack.thread_attributed, root_frames)
    }

    pub fn symbolicate_tree(&self, tree: &CallStackTree, mode: AddressingMode) -> CallStackTree
    {
        let call_stacks = tree
            .call_stacks
            .iter()
            .map(|call_stack| self.symbolicate_call_stack(call_stack, mode))
            .collect();

        CallStackTree::new(call_stacks, tree.call_stack_per_thread)
    }

    /// Symbolicate one diagnostic of any kind.
    ///
    /// Metadata is copied unchanged. An attached exception backtrace is
    /// symbolicated with the same addressing mode as the sampled tree.
    pub fn symbolicate_diagnostic<D>(&self, diagnostic: &Diagnostic<D>) -> Diagnostic<D>
    where
        D: DiagnosticDetails,
    {
        let mode = diagnostic.addressing_mode(&self.policy);
        debug!(kind = %D::KIND, ?mode, "symbolicating diagnostic");

        let exception_info = diagnostic.exception_info.as_ref().map(|info| ExceptionInfo {
            name: info.name.clone(),
            reason: info.reason.clone(),
            backtrace: info
                .backtrace
                .iter()
                .map(|frame| self.symbolicate_frame(frame, mode))
                .collect(),
        });

        Diagnostic {
            version: diagnostic.version.clone(),
            metadata: diagnostic.metadata.clone(),
            call_stack_tree: self.symbolicate_tree(&diagnostic.call_stack_tree, mode),
            application_specific_information: diagnostic.application_specific_information.clone(),
            exception_info,
        }
    }

    /// Symbolicate every diagnostic of every kind, keeping the time range
    /// and the split by kind.
    pub fn symbolicate_payload(&self, payload: &DiagnosticPayload) -> DiagnosticPayload
    {
        DiagnosticPayload {
            time_stamp_begin: payload.time_stamp_begin,
            time_stamp_end: payload.time_stamp_end,
            crash_diagnostics: self.symbolicate_all(payload.crash_diagnostics.as_deref()),
            hang_diagnostics: self.symbolicate_all(payload.hang_diagnostics.as_deref()),
            cpu_exception_diagnostics: self.symbolicate_all(payload.cpu_exception_diagnostics.as_deref()),
            disk_write_exception_diagnostics: self.symbolicate_all(payload.disk_write_exception_diagnostics.as_deref()),
        }
    }

    fn symbolicate_all<D>(&self, diagnostics: Option<&[Diagnostic<D>]>) -> Option<Vec<Diagnostic<D>>>
    where
        D: DiagnosticDetails,
    {
        diagnostics.map(|diagnostics| {
            diagnostics
                .iter()
                .map(|diagnostic| self.symbolicate_diagnostic(diagnostic))
                .collect()
        })
    }

    pub fn symbolicate_crash(&self, diagnostic: &CrashDiagnostic) -> CrashDiagnostic
    {
        self.symbolicate_diagnostic(diagnostic)
    }

    pub fn symbolicate_hang(&self, diagnostic: &HangDiagnostic) -> HangDiagnostic
    {
        self.symbolicate_diagnostic(diagnostic)
    }

    pub fn symbolicate_cpu_exception(&self, diagnostic: &CpuExceptionDiagnostic) -> CpuExceptionDiagnostic
    {
        self.symbolicate_diagnostic(diagnostic)
    }

    pub fn symbolicate_disk_write_exception(
        &self,
        diagnostic: &DiskWriteExceptionDiagnostic,
    ) -> DiskWriteExceptionDiagnostic
    {
        self.symbolicate_diagnostic(diagnostic)
    }
}
