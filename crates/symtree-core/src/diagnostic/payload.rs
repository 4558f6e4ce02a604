//! Diagnostic payloads.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CpuExceptionDiagnostic,
    CrashDiagnostic,
    DiagnosticRef,
    DiskWriteExceptionDiagnostic,
    HangDiagnostic,
};
use crate::aggregate::BinaryImageSet;
use crate::error::Result;
use crate::reconcile::ReconciliationPolicy;
use crate::types::Binary;

/// One delivery of diagnostics covering a reporting window.
///
/// Each kind is optional; an absent list and an empty list are kept distinct
/// so that re-encoding reproduces the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticPayload
{
    #[serde(with = "super::timestamp")]
    pub time_stamp_begin: DateTime<Utc>,
    #[serde(with = "super::timestamp")]
    pub time_stamp_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crash_diagnostics: Option<Vec<CrashDiagnostic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hang_diagnostics: Option<Vec<HangDiagnostic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_exception_diagnostics: Option<Vec<CpuExceptionDiagnostic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_write_exception_diagnostics: Option<Vec<DiskWriteExceptionDiagnostic>>,
}

impl DiagnosticPayload
{
    /// Payload with no diagnostics of any kind.
    pub fn new(time_stamp_begin: DateTime<Utc>, time_stamp_end: DateTime<Utc>) -> Self
    {
        Self {
            time_stamp_begin,
            time_stamp_end,
            crash_diagnostics: None,
            hang_diagnostics: None,
            cpu_exception_diagnostics: None,
            disk_write_exception_diagnostics: None,
        }
    }

    /// Decode a payload.
    ///
    /// Decoding is all or nothing: one malformed diagnostic rejects the
    /// whole payload.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::SymtreeError::Decode`] for malformed JSON, a missing
    /// required field or an unparseable timestamp.
    pub fn from_json(data: &[u8]) -> Result<Self>
    {
        Ok(crate::nesting::from_slice(data)?)
    }

    /// Encode a payload compactly.
    ///
    /// ## Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<Vec<u8>>
    {
        Ok(serde_json::to_vec(self)?)
    }

    /// Encode a payload with indentation.
    ///
    /// ## Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>>
    {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The reporting window, `begin..end`.
    pub fn date_range(&self) -> Range<DateTime<Utc>>
    {
        self.time_stamp_begin..self.time_stamp_end
    }

    /// Every diagnostic, crashes first, then hangs, CPU and disk-write exceptions.
    pub fn diagnostics(&self) -> impl Iterator<Item = DiagnosticRef<'_>>
    {
        let crashes = self.crash_diagnostics.iter().flatten().map(DiagnosticRef::Crash);
        let hangs = self.hang_diagnostics.iter().flatten().map(DiagnosticRef::Hang);
        let cpu = self.cpu_exception_diagnostics.iter().flatten().map(DiagnosticRef::CpuException);
        let disk = self
            .disk_write_exception_diagnostics
            .iter()
            .flatten()
            .map(DiagnosticRef::DiskWriteException);

        crashes.chain(hangs).chain(cpu).chain(disk)
    }

    /// Number of diagnostics across all kinds.
    pub fn len(&self) -> usize
    {
        self.diagnostics().count()
    }

    pub fn is_empty(&self) -> bool
    {
        self.diagnostics().next().is_none()
    }

    /// Distinct binaries across every diagnostic.
    ///
    /// Each diagnostic's frames are read with that diagnostic's own
    /// addressing mode before merging.
    pub fn binary_images(&self, policy: &ReconciliationPolicy) -> Vec<Binary>
    {
        let mut set = BinaryImageSet::new();
        for diagnostic in self.diagnostics() {
            set.extend_from_tree(diagnostic.call_stack_tree(), diagnostic.addressing_mode(policy));
        }
        set.into_sorted_vec()
    }

    /// `true` when every diagnostic present came from Xcode's simulator.
    ///
    /// A payload with no diagnostics counts as simulated.
    pub fn is_simulated(&self) -> bool
    {
        self.diagnostics().all(DiagnosticRef::is_simulated)
    }
}
