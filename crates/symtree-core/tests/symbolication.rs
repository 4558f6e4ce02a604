//! Tests for the symbolication engine

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use symtree_core::diagnostic::{
    CommonMetaData,
    CrashDetails,
    CrashDiagnostic,
    DiagnosticPayload,
    ExceptionInfo,
    MetaData,
};
use symtree_core::reconcile::ReconciliationPolicy;
use symtree_core::resolver::{FnResolver, LoadedImage, NullResolver, StaticImageLookup, SymbolicationTarget};
use symtree_core::symbolication::SymbolicationEngine;
use symtree_core::types::{AddressingMode, CallStack, CallStackTree, Frame, SymbolInfo};
use uuid::Uuid;

fn fixture(name: &str) -> Vec<u8>
{
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    std::fs::read(path).unwrap()
}

/// Resolver answering from a fixed address table and recording every query.
struct MockResolver
{
    results: HashMap<u64, Vec<SymbolInfo>>,
    queries: RefCell<Vec<(u64, SymbolicationTarget)>>,
}

impl MockResolver
{
    fn new(results: impl IntoIterator<Item = (u64, Vec<SymbolInfo>)>) -> Self
    {
        Self {
            results: results.into_iter().collect(),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn empty() -> Self
    {
        Self::new(Vec::new())
    }
}

impl symtree_core::resolver::SymbolResolver for MockResolver
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        self.queries.borrow_mut().push((address, target.clone()));
        self.results.get(&address).cloned().unwrap_or_default()
    }
}

fn crash(os_version: &str, tree: CallStackTree) -> CrashDiagnostic
{
    let common = CommonMetaData::new("", "", "", os_version, "", "");
    CrashDiagnostic::new(MetaData::new(common, CrashDetails::default()), tree)
}

#[test]
fn test_target_calculation()
{
    let id = Uuid::from_u128(9);
    let frame = Frame::new(105).with_binary(id, 100, Some("binary".into()));

    assert_eq!(
        frame.symbolication_target(AddressingMode::LoadAddress),
        Some(SymbolicationTarget::new(id, 100, Some("binary".into())))
    );
    assert_eq!(
        frame.symbolication_target(AddressingMode::Offset),
        Some(SymbolicationTarget::new(id, 5, Some("binary".into())))
    );
    assert_eq!(Frame::new(105).symbolication_target(AddressingMode::Offset), None);
}

#[test]
fn test_symbolicate_call_stack()
{
    let frame_b = Frame::new(2020)
        .with_binary(Uuid::from_u128(2), 2000, Some("binaryB".into()))
        .with_sample_count(1)
        .with_children(Vec::new());
    let frame_a = Frame::new(1015)
        .with_binary(Uuid::from_u128(1), 1000, Some("binaryA".into()))
        .with_sample_count(1)
        .with_children(vec![frame_b]);
    let call_stack = CallStack::new(Some(true), vec![frame_a]);

    let resolver = MockResolver::new([
        (2020, vec![SymbolInfo::new("symbolB").with_offset(10)]),
        (1015, vec![SymbolInfo::new("symbolA").with_offset(10)]),
    ]);
    let engine = SymbolicationEngine::new(&resolver);

    let symbolicated = engine.symbolicate_call_stack(&call_stack, AddressingMode::LoadAddress);

    assert_eq!(symbolicated.thread_attributed, Some(true));
    assert_eq!(symbolicated.root_frames.len(), 1);

    let root = &symbolicated.root_frames[0];
    assert_eq!(root.symbols(), &[SymbolInfo::new("symbolA").with_offset(10)]);
    assert_eq!(root.children().len(), 1);

    let child = &root.children()[0];
    assert_eq!(child.primary_symbol().map(|s| s.symbol.as_str()), Some("symbolB"));
    // An empty child list stays an empty list.
    assert_eq!(child.children, Some(Vec::new()));

    // Only the symbol annotations changed.
    let mut stripped = symbolicated.clone();
    stripped.root_frames[0].symbol_info = None;
    stripped.root_frames[0].children.as_mut().unwrap()[0].symbol_info = None;
    assert_eq!(stripped, call_stack);
}

#[test]
fn test_input_tree_is_not_modified()
{
    let tree = CallStackTree::new(
        vec![CallStack::new(None, vec![Frame::new(10).with_binary(Uuid::nil(), 5, None)])],
        false,
    );
    let before = tree.clone();

    let resolver = FnResolver::new(|_, _: &SymbolicationTarget| vec![SymbolInfo::new("f")]);
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_tree(&tree, AddressingMode::Offset);

    assert_eq!(tree, before);
    assert!(!symbolicated.call_stack_per_thread);
    assert_eq!(symbolicated.call_stacks[0].thread_attributed, None);
    assert_eq!(symbolicated.call_stacks[0].root_frames[0].symbols().len(), 1);
}

#[test]
fn test_unresolved_and_anonymous_frames()
{
    let tree = CallStackTree::new(
        vec![CallStack::new(
            Some(false),
            vec![Frame::new(10).with_binary(Uuid::nil(), 5, None), Frame::new(20)],
        )],
        true,
    );

    let resolver = MockResolver::empty();
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_tree(&tree, AddressingMode::Offset);

    let roots = &symbolicated.call_stacks[0].root_frames;
    // Resolver consulted, nothing found: still emitted, with an empty list.
    assert_eq!(roots[0].symbol_info, Some(Vec::new()));
    // No binary identity: resolver never consulted, list still emitted.
    assert_eq!(roots[1].symbol_info, Some(Vec::new()));
    assert_eq!(resolver.queries.borrow().len(), 1);
}

#[test]
fn test_existing_annotations_are_replaced()
{
    let mut anonymous = Frame::new(5);
    anonymous.symbol_info = Some(vec![SymbolInfo::new("stale")]);
    let mut framed = Frame::new(1015).with_binary(Uuid::from_u128(1), 15, None);
    framed.symbol_info = Some(vec![SymbolInfo::new("stale")]);
    let tree = CallStackTree::new(vec![CallStack::new(Some(true), vec![anonymous, framed])], true);

    let resolver = FnResolver::new(|_, _: &SymbolicationTarget| Vec::new());
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_tree(&tree, AddressingMode::Offset);

    for frame in symbolicated.frames() {
        assert_eq!(frame.symbol_info, Some(Vec::new()));
    }

    // Same tree apart from the annotations.
    let mut restored = symbolicated.clone();
    for frame in &mut restored.call_stacks[0].root_frames {
        frame.symbol_info = Some(vec![SymbolInfo::new("stale")]);
    }
    assert_eq!(restored, tree);
}

#[test]
fn test_deep_chain_is_symbolicated()
{
    let depth = 1_000;
    let id = Uuid::from_u128(4);
    let mut chain = Frame::new(1_000 + depth).with_binary(id, 1_000, None);
    for address in (1_000..1_000 + depth).rev() {
        chain = Frame::new(address).with_binary(id, 1_000, None).with_children(vec![chain]);
    }
    let tree = CallStackTree::new(vec![CallStack::new(Some(true), vec![chain])], true);

    let resolver = FnResolver::new(|address, target: &SymbolicationTarget| {
        vec![SymbolInfo::new("f").with_offset(address - target.load_address)]
    });
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_tree(&tree, AddressingMode::LoadAddress);

    let frames: Vec<&Frame> = symbolicated.frames().collect();
    assert_eq!(frames.len() as u64, depth + 1);
    assert_eq!(frames.last().unwrap().primary_symbol().unwrap().offset, Some(depth));
}

#[test]
fn test_using_crash_offsets()
{
    let frame = Frame::new(1015)
        .with_binary(Uuid::from_u128(1), 15, Some("binaryA".into()))
        .with_sample_count(1)
        .with_children(Vec::new());
    let tree = CallStackTree::new(vec![CallStack::new(Some(true), vec![frame])], true);

    let resolver = MockResolver::empty();
    let engine = SymbolicationEngine::new(&resolver);

    engine.symbolicate_diagnostic(&crash("macOS 13.0 (22A5358e)", tree.clone()));
    assert_eq!(resolver.queries.borrow().last().unwrap().1.load_address, 1000);

    engine.symbolicate_diagnostic(&crash("macOS 12.1", tree));
    assert_eq!(resolver.queries.borrow().last().unwrap().1.load_address, 15);
}

#[test]
fn test_policy_override()
{
    let frame = Frame::new(1015).with_binary(Uuid::from_u128(1), 15, None);
    let tree = CallStackTree::new(vec![CallStack::new(Some(true), vec![frame])], true);

    let resolver = MockResolver::empty();
    let engine = SymbolicationEngine::with_policy(&resolver, ReconciliationPolicy::forced(AddressingMode::Offset));

    engine.symbolicate_diagnostic(&crash("macOS 12.1", tree));
    assert_eq!(resolver.queries.borrow()[0].1.load_address, 1000);
}

#[test]
fn test_symbolicates_all_diagnostic_types()
{
    let payload = DiagnosticPayload::from_json(&fixture("xcode_simulated.json")).unwrap();
    let symbol = SymbolInfo::new("symSymbol").with_offset(10);

    let resolver = MockResolver::new([(74565, vec![symbol.clone()])]);
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_payload(&payload);

    let expected = Some(vec![symbol]);
    let first_root = |tree: &CallStackTree| tree.call_stacks[0].root_frames[0].symbol_info.clone();

    assert_eq!(first_root(&symbolicated.crash_diagnostics.as_ref().unwrap()[0].call_stack_tree), expected);
    assert_eq!(first_root(&symbolicated.hang_diagnostics.as_ref().unwrap()[0].call_stack_tree), expected);
    assert_eq!(
        first_root(&symbolicated.cpu_exception_diagnostics.as_ref().unwrap()[0].call_stack_tree),
        expected
    );
    assert_eq!(
        first_root(&symbolicated.disk_write_exception_diagnostics.as_ref().unwrap()[0].call_stack_tree),
        expected
    );

    assert_eq!(symbolicated.date_range(), payload.date_range());
    assert_eq!(
        symbolicated.crash_diagnostics.as_ref().unwrap()[0].metadata,
        payload.crash_diagnostics.as_ref().unwrap()[0].metadata
    );
    // Sample-only kinds keep their missing attribution.
    assert_eq!(
        symbolicated.cpu_exception_diagnostics.as_ref().unwrap()[0].call_stack_tree.call_stacks[0].thread_attributed,
        None
    );
}

#[test]
fn test_each_diagnostic_uses_its_own_os_version()
{
    let payload = DiagnosticPayload::from_json(&fixture("nested_report.json")).unwrap();

    let resolver = MockResolver::empty();
    SymbolicationEngine::new(&resolver).symbolicate_payload(&payload);

    // iOS 16 reports true offsets: every query sees the real load address.
    let queries = resolver.queries.borrow();
    assert_eq!(queries.len(), 5);

    let (_, target) = queries.iter().find(|(address, _)| *address == 6_859_816_880).unwrap();
    assert_eq!(target.load_address, 6_859_616_256);
    assert_eq!(target.path.as_deref(), Some("libswiftCore.dylib"));
}

#[test]
fn test_absent_kinds_stay_absent()
{
    let payload = DiagnosticPayload::from_json(&fixture("nested_report.json")).unwrap();
    let symbolicated = SymbolicationEngine::new(NullResolver).symbolicate_payload(&payload);

    assert!(symbolicated.hang_diagnostics.is_none());
    assert!(symbolicated.cpu_exception_diagnostics.is_none());
    assert_eq!(symbolicated.crash_diagnostics.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_exception_backtrace_is_symbolicated()
{
    let id = Uuid::from_u128(3);
    let images = StaticImageLookup::new().with_image(LoadedImage::new(id, 0x4000, 0x1000, None));
    let info = ExceptionInfo::from_return_addresses(
        "NSRangeException",
        "index 3 beyond bounds",
        &[0x4010, 0x4020],
        &images,
        AddressingMode::Offset,
    );

    let tree = CallStackTree::new(Vec::new(), true);
    let diagnostic = crash("iPhone OS 16.1 (20B82)", tree).with_exception_info(info);

    let resolver = FnResolver::new(|address, target: &SymbolicationTarget| {
        vec![SymbolInfo::new("thrower").with_offset(address - target.load_address)]
    });
    let symbolicated = SymbolicationEngine::new(&resolver).symbolicate_diagnostic(&diagnostic);

    let backtrace = &symbolicated.exception_info.as_ref().unwrap().backtrace;
    assert_eq!(backtrace[0].primary_symbol().unwrap().offset, Some(0x10));
    assert_eq!(backtrace[0].children()[0].primary_symbol().unwrap().offset, Some(0x20));
    assert_eq!(symbolicated.exception_info.as_ref().unwrap().name, "NSRangeException");
}
