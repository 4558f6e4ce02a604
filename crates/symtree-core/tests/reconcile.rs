//! Tests for load-address reconciliation

use symtree_core::reconcile::{uses_offset_as_load_address, OsVersion, Platform, ReconciliationPolicy};
use symtree_core::types::AddressingMode;

#[test]
fn test_legacy_releases()
{
    for version in [
        "iPhone OS 14.0.1 (18A393)",
        "iPhone OS 15.7 (19H12)",
        "iPadOS 15.4 (19E241)",
        "macOS 12.1",
        "macOS 12.6.1 (21G217)",
        "Mac OS X 10.15.7 (19H2)",
        "watchOS 8.5 (19T242)",
        "tvOS 15.4 (19L440)",
    ] {
        assert!(uses_offset_as_load_address(version), "{version}");
    }
}

#[test]
fn test_offset_releases()
{
    for version in [
        "macOS 13.0 (22A5358e)",
        "iPhone OS 16.1 (20B82)",
        "iOS 17.0 (21A329)",
        "watchOS 9.0 (20R362)",
        "tvOS 16.0 (20J373)",
        "visionOS 1.0 (21N305)",
    ] {
        assert!(!uses_offset_as_load_address(version), "{version}");
    }
}

#[test]
fn test_build_train_without_platform()
{
    // ProcessInfo style strings name no platform.
    assert!(uses_offset_as_load_address("Version 12.0 (Build 21A344)"));
    assert!(!uses_offset_as_load_address("Version 13.0 (Build 22A380)"));
}

#[test]
fn test_unrecognised_string_uses_fallback()
{
    assert!(!uses_offset_as_load_address(""));
    assert!(!uses_offset_as_load_address("Linux"));

    let policy = ReconciliationPolicy::default().with_fallback(AddressingMode::LoadAddress);
    assert_eq!(policy.addressing_mode("Linux"), AddressingMode::LoadAddress);
}

#[test]
fn test_forced_mode_ignores_version()
{
    let policy = ReconciliationPolicy::forced(AddressingMode::LoadAddress);
    assert_eq!(policy.addressing_mode("macOS 14.0 (23A344)"), AddressingMode::LoadAddress);

    let policy = ReconciliationPolicy::forced(AddressingMode::Offset);
    assert_eq!(policy.addressing_mode("iPhone OS 14.0.1 (18A393)"), AddressingMode::Offset);
}

#[test]
fn test_configurable_breakpoint()
{
    let policy = ReconciliationPolicy::default().with_last_legacy(Platform::MacOS, OsVersion::new(12, 3));

    assert!(policy.uses_offset_as_load_address("macOS 12.3 (21E230)"));
    assert!(!policy.uses_offset_as_load_address("macOS 12.4 (21F79)"));
}
