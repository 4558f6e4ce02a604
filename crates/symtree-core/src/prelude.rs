//! Common module for library exports

pub use crate::aggregate::BinaryImageSet;
pub use crate::diagnostic::{
    CommonMetaData,
    CpuExceptionDiagnostic,
    CrashDiagnostic,
    Diagnostic,
    DiagnosticKind,
    DiagnosticPayload,
    DiagnosticRef,
    DiskWriteExceptionDiagnostic,
    ExceptionInfo,
    HangDiagnostic,
};
pub use crate::error::{Result, SymtreeError};
pub use crate::reconcile::{OsVersion, Platform, ReconciliationPolicy};
#[cfg(unix)]
pub use crate::resolver::DladdrResolver;
pub use crate::resolver::{
    DwarfResolver,
    FnResolver,
    ImageLookup,
    LoadedImage,
    StaticImageLookup,
    SymbolResolver,
    SymbolicationTarget,
};
pub use crate::symbolication::SymbolicationEngine;
pub use crate::types::{AddressingMode, Binary, CallStack, CallStackTree, Frame, SymbolInfo};
