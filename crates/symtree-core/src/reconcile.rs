//! # Load-Address Reconciliation
//!
//! Decides, per diagnostic, how `offsetIntoBinaryTextSegment` must be read.
//!
//! On older OS releases the field holds the binary's absolute load address.
//! On newer releases it holds a true offset (`address - load_address`). The
//! payload carries no flag for this; the only input is the free-text OS
//! version string from the diagnostic metadata, for example:
//!
//! - `iPhone OS 14.0.1 (18A393)`
//! - `macOS 13.0 (22A5358e)`
//! - `Version 12.0 (Build 21A344)`
//!
//! The string is parsed only for this decision. When the platform version is
//! recognisable it is compared against a per-platform "last legacy release".
//! Otherwise the Darwin build train (the leading number of the build
//! identifier) is compared against a single train breakpoint. Anything else
//! falls back to [`ReconciliationPolicy::fallback`], which defaults to
//! true-offset semantics.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use tracing::{trace, warn};

use crate::error::SymtreeError;
use crate::types::AddressingMode;

/// Operating system families that emit these diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Platform
{
    MacOS,
    /// iOS and iPadOS (reported as `iPhone OS` by older releases).
    IOS,
    TvOS,
    WatchOS,
    VisionOS,
}

impl Platform
{
    // Checked in order; longer names first so `visionos` never reads as `ios`.
    const MARKERS: &'static [(&'static str, Platform)] = &[
        ("visionos", Platform::VisionOS),
        ("xros", Platform::VisionOS),
        ("watchos", Platform::WatchOS),
        ("tvos", Platform::TvOS),
        ("mac os x", Platform::MacOS),
        ("macos", Platform::MacOS),
        ("os x", Platform::MacOS),
        ("ipados", Platform::IOS),
        ("iphone os", Platform::IOS),
        ("ios", Platform::IOS),
    ];

    fn detect(lowercase: &str) -> Option<Self>
    {
        Self::MARKERS
            .iter()
            .find(|(marker, _)| lowercase.contains(marker))
            .map(|(_, platform)| *platform)
    }
}

impl fmt::Display for Platform
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            Platform::MacOS => "macOS",
            Platform::IOS => "iOS",
            Platform::TvOS => "tvOS",
            Platform::WatchOS => "watchOS",
            Platform::VisionOS => "visionOS",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Platform
{
    type Err = SymtreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let lowercase = s.trim().to_lowercase();
        Platform::detect(&lowercase).ok_or_else(|| SymtreeError::InvalidArgument(format!("unknown platform: {s}")))
    }
}

/// A `major.minor` release number.
///
/// A breakpoint without a minor component covers every minor release of its
/// major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsVersion
{
    pub major: u32,
    pub minor: Option<u32>,
}

impl OsVersion
{
    /// Every release of `major`.
    #[must_use]
    pub const fn major(major: u32) -> Self
    {
        Self { major, minor: None }
    }

    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self
    {
        Self {
            major,
            minor: Some(minor),
        }
    }

    /// `true` when `self` is at or below `breakpoint`.
    #[must_use]
    pub fn at_or_below(self, breakpoint: OsVersion) -> bool
    {
        match self.major.cmp(&breakpoint.major) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match breakpoint.minor {
                None => true,
                Some(limit) => self.minor.unwrap_or(0) <= limit,
            },
        }
    }

    /// Parse the leading `major[.minor[.patch]]` run of `text`.
    fn parse_leading(text: &str) -> Option<Self>
    {
        let mut parts = text.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|part| part.parse().ok());
        Some(Self { major, minor })
    }
}

impl fmt::Display for OsVersion
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.minor {
            Some(minor) => write!(f, "{}.{minor}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

impl FromStr for OsVersion
{
    type Err = SymtreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty() && trimmed.split('.').take(3).all(|part| part.parse::<u32>().is_ok());
        if !valid || trimmed.split('.').count() > 2 {
            return Err(SymtreeError::InvalidArgument(format!("expected MAJOR or MAJOR.MINOR, got {s}")));
        }
        OsVersion::parse_leading(trimmed)
            .ok_or_else(|| SymtreeError::InvalidArgument(format!("expected MAJOR or MAJOR.MINOR, got {s}")))
    }
}

/// What could be recognised in an OS version string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedOsVersion
{
    pub platform: Option<Platform>,
    pub version: Option<OsVersion>,
    /// Build identifier found in parentheses, e.g. `22A5358e`.
    pub build: Option<String>,
}

impl ParsedOsVersion
{
    /// Best-effort parse. Never fails; unrecognised parts stay `None`.
    #[must_use]
    pub fn parse(text: &str) -> Self
    {
        let (outside, inside) = match text.find('(') {
            Some(open) => {
                let rest = &text[open + 1..];
                let close = rest.find(')').unwrap_or(rest.len());
                (&text[..open], Some(&rest[..close]))
            }
            None => (text, None),
        };

        let platform = Platform::detect(&outside.to_lowercase());
        let version = outside
            .split_whitespace()
            .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
            .and_then(OsVersion::parse_leading);
        let build = inside
            .and_then(|content| content.split_whitespace().last())
            .filter(|token| token.starts_with(|c: char| c.is_ascii_digit()))
            .map(str::to_string);

        Self {
            platform,
            version,
            build,
        }
    }

    /// Darwin major version encoded as the leading number of the build id.
    #[must_use]
    pub fn build_train(&self) -> Option<u32>
    {
        let build = self.build.as_deref()?;
        let digits = build.find(|c: char| !c.is_ascii_digit()).unwrap_or(build.len());
        build[..digits].parse().ok()
    }
}

/// Configuration for the addressing-mode decision.
///
/// The breakpoints are policy, not structure: the defaults reproduce the
/// releases where the field changed meaning (macOS 13, iOS 16 and their
/// siblings, Darwin 22) and every one of them can be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPolicy
{
    /// Last release, per platform, that stores load addresses.
    pub last_legacy: BTreeMap<Platform, OsVersion>,
    /// Last Darwin build train that stores load addresses.
    pub last_legacy_build_train: Option<u32>,
    /// Mode used when nothing in the version string is recognised.
    pub fallback: AddressingMode,
    /// Skip parsing altogether and use this mode.
    pub forced: Option<AddressingMode>,
}

impl Default for ReconciliationPolicy
{
    fn default() -> Self
    {
        let last_legacy = BTreeMap::from([
            (Platform::MacOS, OsVersion::major(12)),
            (Platform::IOS, OsVersion::major(15)),
            (Platform::TvOS, OsVersion::major(15)),
            (Platform::WatchOS, OsVersion::major(8)),
            // Every visionOS release stores true offsets.
            (Platform::VisionOS, OsVersion::major(0)),
        ]);

        Self {
            last_legacy,
            last_legacy_build_train: Some(21),
            fallback: AddressingMode::Offset,
            forced: None,
        }
    }
}

impl ReconciliationPolicy
{
    /// Policy that always answers `mode`.
    #[must_use]
    pub fn forced(mode: AddressingMode) -> Self
    {
        Self {
            forced: Some(mode),
            ..Self::default()
        }
    }

    /// Replace the breakpoint for one platform.
    #[must_use]
    pub fn with_last_legacy(mut self, platform: Platform, version: OsVersion) -> Self
    {
        self.last_legacy.insert(platform, version);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, mode: AddressingMode) -> Self
    {
        self.fallback = mode;
        self
    }

    /// Addressing mode for a diagnostic reporting `os_version`.
    pub fn addressing_mode(&self, os_version: &str) -> AddressingMode
    {
        if let Some(mode) = self.forced {
            return mode;
        }

        let parsed = ParsedOsVersion::parse(os_version);

        if let (Some(platform), Some(version)) = (parsed.platform, parsed.version) {
            if let Some(breakpoint) = self.last_legacy.get(&platform) {
                let legacy = version.at_or_below(*breakpoint);
                trace!(%platform, %version, %breakpoint, legacy, "reconciled from platform version");
                return AddressingMode::from_offset_is_load_address(legacy);
            }
        }

        if let (Some(train), Some(breakpoint)) = (parsed.build_train(), self.last_legacy_build_train) {
            let legacy = train <= breakpoint;
            trace!(train, breakpoint, legacy, "reconciled from build train");
            return AddressingMode::from_offset_is_load_address(legacy);
        }

        warn!(
            os_version,
            fallback = ?self.fallback,
            "unrecognised OS version string, using fallback addressing mode"
        );
        self.fallback
    }

    /// `true` when frames from `os_version` store load addresses.
    pub fn uses_offset_as_load_address(&self, os_version: &str) -> bool
    {
        self.addressing_mode(os_version).offset_is_load_address()
    }
}

/// [`ReconciliationPolicy::uses_offset_as_load_address`] under the default policy.
pub fn uses_offset_as_load_address(os_version: &str) -> bool
{
    DEFAULT_POLICY.uses_offset_as_load_address(os_version)
}

static DEFAULT_POLICY: Lazy<ReconciliationPolicy> = Lazy::new(ReconciliationPolicy::default);
