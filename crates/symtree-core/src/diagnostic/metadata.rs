//! Diagnostic metadata.
//!
//! Every diagnostic kind shares [`CommonMetaData`]; the kind-specific fields
//! live in a details type flattened next to it on the wire.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The four diagnostic kinds a payload partitions its diagnostics into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind
{
    Crash,
    Hang,
    CpuException,
    DiskWriteException,
}

impl DiagnosticKind
{
    pub const ALL: [DiagnosticKind; 4] = [
        DiagnosticKind::Crash,
        DiagnosticKind::Hang,
        DiagnosticKind::CpuException,
        DiagnosticKind::DiskWriteException,
    ];

    /// Payload key holding diagnostics of this kind.
    #[must_use]
    pub const fn payload_key(self) -> &'static str
    {
        match self {
            DiagnosticKind::Crash => "crashDiagnostics",
            DiagnosticKind::Hang => "hangDiagnostics",
            DiagnosticKind::CpuException => "cpuExceptionDiagnostics",
            DiagnosticKind::DiskWriteException => "diskWriteExceptionDiagnostics",
        }
    }
}

impl fmt::Display for DiagnosticKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            DiagnosticKind::Crash => "crash",
            DiagnosticKind::Hang => "hang",
            DiagnosticKind::CpuException => "cpu-exception",
            DiagnosticKind::DiskWriteException => "disk-write-exception",
        };
        write!(f, "{label}")
    }
}

/// Kind-specific metadata carried next to [`CommonMetaData`].
pub trait DiagnosticDetails: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned
{
    const KIND: DiagnosticKind;
}

/// Metadata fields every diagnostic kind reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonMetaData
{
    pub device_type: String,
    #[serde(rename = "appBuildVersion")]
    pub application_build_version: String,
    #[serde(rename = "appVersion")]
    pub application_version: String,
    /// Free text such as `iPhone OS 14.0.1 (18A393)`.
    ///
    /// Only ever read by [`crate::reconcile`].
    pub os_version: String,
    pub platform_architecture: String,
    pub region_format: String,
    #[serde(rename = "isTestFlightApp", default, skip_serializing_if = "Option::is_none")]
    pub is_test_flight_app: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_power_mode_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
}

impl CommonMetaData
{
    pub fn new(
        device_type: impl Into<String>,
        application_build_version: impl Into<String>,
        application_version: impl Into<String>,
        os_version: impl Into<String>,
        platform_architecture: impl Into<String>,
        region_format: impl Into<String>,
    ) -> Self
    {
        Self {
            device_type: device_type.into(),
            application_build_version: application_build_version.into(),
            application_version: application_version.into(),
            os_version: os_version.into(),
            platform_architecture: platform_architecture.into(),
            region_format: region_format.into(),
            is_test_flight_app: None,
            low_power_mode_enabled: None,
            pid: None,
        }
    }
}

/// Metadata of one diagnostic: common fields plus kind-specific details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData<D>
{
    #[serde(flatten)]
    pub common: CommonMetaData,
    #[serde(flatten)]
    pub details: D,
}

impl<D> MetaData<D>
{
    pub fn new(common: CommonMetaData, details: D) -> Self
    {
        Self { common, details }
    }
}

/// Structured description of an uncaught language exception.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionReason
{
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composed_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashDetails
{
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_memory_region_info: Option<String>,
    /// Mach exception type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_reason: Option<ExceptionReason>,
}

impl DiagnosticDetails for CrashDetails
{
    const KIND: DiagnosticKind = DiagnosticKind::Crash;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HangDetails
{
    /// Duration as reported, e.g. `"6 sec"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hang_duration: Option<String>,
}

impl DiagnosticDetails for HangDetails
{
    const KIND: DiagnosticKind = DiagnosticKind::Hang;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuExceptionDetails
{
    #[serde(rename = "totalCPUTime", default, skip_serializing_if = "Option::is_none")]
    pub total_cpu_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sampled_time: Option<String>,
}

impl DiagnosticDetails for CpuExceptionDetails
{
    const KIND: DiagnosticKind = DiagnosticKind::CpuException;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskWriteExceptionDetails
{
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writes_caused: Option<String>,
}

impl DiagnosticDetails for DiskWriteExceptionDetails
{
    const KIND: DiagnosticKind = DiagnosticKind::DiskWriteException;
}
