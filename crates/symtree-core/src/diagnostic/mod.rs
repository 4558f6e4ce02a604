//! # Diagnostics
//!
//! A diagnostic is one report: metadata plus a [`CallStackTree`]. All four
//! kinds share that shape and differ only in their metadata details, so a
//! single generic [`Diagnostic`] covers them, parameterised by the details
//! type. [`DiagnosticRef`] is the tagged view used when walking a payload.

pub mod exception;
pub mod metadata;
pub mod payload;
pub mod timestamp;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use exception::ExceptionInfo;
pub use metadata::{
    CommonMetaData,
    CpuExceptionDetails,
    CrashDetails,
    DiagnosticDetails,
    DiagnosticKind,
    DiskWriteExceptionDetails,
    ExceptionReason,
    HangDetails,
    MetaData,
};
pub use payload::DiagnosticPayload;

use crate::error::Result;
use crate::reconcile::ReconciliationPolicy;
use crate::types::{AddressingMode, Binary, CallStackTree};

/// Version written into newly built diagnostics.
pub const DIAGNOSTIC_VERSION: &str = "1.0.0";

fn default_version() -> String
{
    DIAGNOSTIC_VERSION.to_string()
}

/// One report of any kind.
///
/// `application_specific_information` and `exception_info` are only ever
/// filled in for crashes, by the crashing process itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic<D>
{
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(rename = "diagnosticMetaData")]
    pub metadata: MetaData<D>,
    pub call_stack_tree: CallStackTree,
    /// Per-binary crash annotations, keyed by binary name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_specific_information: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_info: Option<ExceptionInfo>,
}

pub type CrashDiagnostic = Diagnostic<CrashDetails>;
pub type HangDiagnostic = Diagnostic<HangDetails>;
pub type CpuExceptionDiagnostic = Diagnostic<CpuExceptionDetails>;
pub type DiskWriteExceptionDiagnostic = Diagnostic<DiskWriteExceptionDetails>;

impl<D> Diagnostic<D>
where
    D: DiagnosticDetails,
{
    pub fn new(metadata: MetaData<D>, call_stack_tree: CallStackTree) -> Self
    {
        Self {
            version: default_version(),
            metadata,
            call_stack_tree,
            application_specific_information: None,
            exception_info: None,
        }
    }

    #[must_use]
    pub fn with_exception_info(mut self, exception_info: ExceptionInfo) -> Self
    {
        self.exception_info = Some(exception_info);
        self
    }

    #[must_use]
    pub fn with_application_specific_information(mut self, info: BTreeMap<String, Vec<String>>) -> Self
    {
        self.application_specific_information = Some(info);
        self
    }

    pub fn kind(&self) -> DiagnosticKind
    {
        D::KIND
    }

    pub fn common(&self) -> &CommonMetaData
    {
        &self.metadata.common
    }

    pub fn details(&self) -> &D
    {
        &self.metadata.details
    }

    /// How this diagnostic's frames store their binary offsets.
    pub fn addressing_mode(&self, policy: &ReconciliationPolicy) -> AddressingMode
    {
        policy.addressing_mode(&self.metadata.common.os_version)
    }

    /// Distinct binaries referenced by this diagnostic's tree.
    pub fn binary_images(&self, policy: &ReconciliationPolicy) -> Vec<Binary>
    {
        self.call_stack_tree.binary_images(self.addressing_mode(policy))
    }

    pub fn is_simulated(&self) -> bool
    {
        self.call_stack_tree.is_simulated()
    }

    /// Decode one diagnostic.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::SymtreeError::Decode`] for malformed JSON or missing
    /// required fields.
    pub fn from_json(data: &[u8]) -> Result<Self>
    {
        Ok(crate::nesting::from_slice(data)?)
    }

    /// Encode one diagnostic.
    ///
    /// ## Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<Vec<u8>>
    {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Borrowed view of a diagnostic of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticRef<'a>
{
    Crash(&'a CrashDiagnostic),
    Hang(&'a HangDiagnostic),
    CpuException(&'a CpuExceptionDiagnostic),
    DiskWriteException(&'a DiskWriteExceptionDiagnostic),
}

macro_rules! with_diagnostic {
    ($value:expr, $diagnostic:ident => $body:expr) => {
        match $value {
            DiagnosticRef::Crash($diagnostic) => $body,
            DiagnosticRef::Hang($diagnostic) => $body,
            DiagnosticRef::CpuException($diagnostic) => $body,
            DiagnosticRef::DiskWriteException($diagnostic) => $body,
        }
    };
}

impl<'a> DiagnosticRef<'a>
{
    pub fn kind(self) -> DiagnosticKind
    {
        with_diagnostic!(self, d => d.kind())
    }

    pub fn common(self) -> &'a CommonMetaData
    {
        with_diagnostic!(self, d => &d.metadata.common)
    }

    pub fn call_stack_tree(self) -> &'a CallStackTree
    {
        with_diagnostic!(self, d => &d.call_stack_tree)
    }

    pub fn addressing_mode(self, policy: &ReconciliationPolicy) -> AddressingMode
    {
        with_diagnostic!(self, d => d.addressing_mode(policy))
    }

    pub fn binary_images(self, policy: &ReconciliationPolicy) -> Vec<Binary>
    {
        with_diagnostic!(self, d => d.binary_images(policy))
    }

    pub fn is_simulated(self) -> bool
    {
        with_diagnostic!(self, d => d.is_simulated())
    }
}
