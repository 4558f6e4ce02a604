//! Tests for frame tree traversal, binary derivation and image aggregation

use std::path::PathBuf;

use symtree_core::aggregate::BinaryImageSet;
use symtree_core::diagnostic::DiagnosticPayload;
use symtree_core::reconcile::ReconciliationPolicy;
use symtree_core::types::{AddressingMode, Binary, CallStack, CallStackTree, Frame};
use uuid::Uuid;

fn fixture(name: &str) -> Vec<u8>
{
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read(path).unwrap()
}

fn uuid(text: &str) -> Uuid
{
    Uuid::parse_str(text).unwrap()
}

#[test]
fn test_call_stack_frames_are_root_first_depth_first()
{
    let payload = DiagnosticPayload::from_json(&fixture("nested_report.json")).unwrap();
    let tree = &payload.crash_diagnostics.as_ref().unwrap()[0].call_stack_tree;

    let first: Vec<u64> = tree.call_stacks[0].frames().iter().map(|f| f.address).collect();
    assert_eq!(first, vec![6_859_816_880, 4_303_590_000, 4_303_603_064, 6_795_285_912]);

    let second: Vec<u64> = tree.call_stacks[1].frames().iter().map(|f| f.address).collect();
    assert_eq!(second, vec![6_795_285_000, 12345]);

    assert_eq!(tree.frames().count(), 6);
    assert_eq!(tree.attributed_call_stack(), Some(&tree.call_stacks[0]));
}

#[test]
fn test_sibling_roots_keep_their_order()
{
    let stack = CallStack::new(
        None,
        vec![
            Frame::new(1).with_children(vec![Frame::new(2), Frame::new(3).with_children(vec![Frame::new(4)])]),
            Frame::new(5),
        ],
    );
    let addresses: Vec<u64> = stack.frames().iter().map(|f| f.address).collect();
    assert_eq!(addresses, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_binary_legacy_addressing()
{
    let id = uuid("CDB53DDB-2337-4933-B62F-4356E6174AF0");
    let frame = Frame::new(74565).with_binary(id, 123, Some("testBinaryName".into()));

    let binary = frame.binary(AddressingMode::LoadAddress).unwrap();
    assert_eq!(binary, Binary::new(id, 123, 74443, Some("testBinaryName".into())));
}

#[test]
fn test_binary_offset_addressing()
{
    let id = uuid("CDB53DDB-2337-4933-B62F-4356E6174AF0");
    let frame = Frame::new(74565).with_binary(id, 123, None);

    let binary = frame.binary(AddressingMode::Offset).unwrap();
    assert_eq!(binary.load_address, 74442);
    assert_eq!(binary.approximate_size, 124);
    assert!(binary.contains(74565));
    assert!(!binary.contains(74566));
}

#[test]
fn test_binary_degenerate_load_address()
{
    let frame = Frame::new(1000).with_binary(Uuid::nil(), 2000, None);
    let binary = frame.binary(AddressingMode::LoadAddress).unwrap();
    assert_eq!(binary.load_address, 2000);
    assert_eq!(binary.approximate_size, 1);
}

#[test]
fn test_aggregation_keeps_largest_size()
{
    let id = Uuid::from_u128(42);
    let small = Frame::new(1099).with_binary(id, 1000, None);
    let large = Frame::new(1499).with_binary(id, 1000, None);

    for roots in [vec![small.clone(), large.clone()], vec![large, small]] {
        let tree = CallStackTree::new(vec![CallStack::new(None, roots)], false);
        let images = tree.binary_images(AddressingMode::LoadAddress);
        assert_eq!(images, vec![Binary::new(id, 1000, 500, None)]);
    }
}

#[test]
fn test_aggregation_over_nested_report()
{
    let payload = DiagnosticPayload::from_json(&fixture("nested_report.json")).unwrap();
    let crash = &payload.crash_diagnostics.as_ref().unwrap()[0];

    let images = crash.binary_images(&ReconciliationPolicy::default());
    let summary: Vec<(Uuid, u64, u64)> = images
        .iter()
        .map(|b| (b.id, b.load_address, b.approximate_size))
        .collect();

    assert_eq!(
        summary,
        vec![
            (uuid("444F912B-06E7-395E-9E6E-D947B07401AC"), 4_303_568_896, 34_169),
            (uuid("77E57314-8A58-3064-90C0-8AF9A4745430"), 6_795_280_384, 5_529),
            (uuid("9156BE86-D4B6-3A81-8460-8728FA38C978"), 6_859_616_256, 200_625),
        ]
    );
    assert_eq!(images[0].name.as_deref(), Some("MetricKitTest"));
}

#[test]
fn test_payload_images_merge_across_diagnostics()
{
    let payload = DiagnosticPayload::from_json(&fixture("xcode_simulated.json")).unwrap();
    let images = payload.binary_images(&ReconciliationPolicy::default());

    // iOS 14 stores load addresses.
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].load_address, 123);
    assert_eq!(images[0].approximate_size, 74443);
}

#[test]
fn test_image_set_extend()
{
    let id = Uuid::from_u128(1);
    let mut set = BinaryImageSet::new();
    set.extend([Binary::new(id, 0, 10, None), Binary::new(id, 0, 5, None)]);
    assert_eq!(set.into_sorted_vec(), vec![Binary::new(id, 0, 10, None)]);
}
