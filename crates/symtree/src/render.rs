//! Text output for the `images` and `trace` commands.

use std::fmt::Write;

use serde_json::{Value, json};
use symtree_core::prelude::*;

fn mode_label(mode: AddressingMode) -> &'static str
{
    match mode {
        AddressingMode::LoadAddress => "load-address",
        AddressingMode::Offset => "offset",
    }
}

fn header(out: &mut String, index: usize, diagnostic: DiagnosticRef<'_>, policy: &ReconciliationPolicy)
{
    let _ = writeln!(
        out,
        "{} #{index}  {}  [{}]",
        diagnostic.kind(),
        diagnostic.common().os_version,
        mode_label(diagnostic.addressing_mode(policy))
    );
}

/// One table of images per diagnostic, ordered by load address.
pub fn images(payload: &DiagnosticPayload, policy: &ReconciliationPolicy) -> String
{
    let mut out = String::new();
    for (index, diagnostic) in payload.diagnostics().enumerate() {
        header(&mut out, index, diagnostic, policy);
        for binary in diagnostic.binary_images(policy) {
            let last = binary.load_address.saturating_add(binary.approximate_size.saturating_sub(1));
            let _ = writeln!(
                out,
                "  {:#018x} - {:#018x}  {}  {}",
                binary.load_address,
                last,
                binary.id.hyphenated().to_string().to_uppercase(),
                binary.name.as_deref().unwrap_or("???")
            );
        }
    }
    out
}

/// JSON form of [`images`].
pub fn image_listing(payload: &DiagnosticPayload, policy: &ReconciliationPolicy) -> Value
{
    let diagnostics: Vec<Value> = payload
        .diagnostics()
        .map(|diagnostic| {
            json!({
                "kind": diagnostic.kind().to_string(),
                "osVersion": diagnostic.common().os_version,
                "addressing": mode_label(diagnostic.addressing_mode(policy)),
                "binaryImages": diagnostic.binary_images(policy),
            })
        })
        .collect();
    Value::Array(diagnostics)
}

/// Every call stack of every diagnostic, frames indented by depth.
pub fn trace(payload: &DiagnosticPayload, policy: &ReconciliationPolicy) -> String
{
    let mut out = String::new();
    for (index, diagnostic) in payload.diagnostics().enumerate() {
        header(&mut out, index, diagnostic, policy);
        for (stack_index, stack) in diagnostic.call_stack_tree().call_stacks.iter().enumerate() {
            let attributed = if stack.is_attributed() { " (attributed)" } else { "" };
            let _ = writeln!(out, "  Call stack {stack_index}{attributed}");

            frame_lines(&mut out, &stack.root_frames);
        }
    }
    out
}

/// Depth-first listing of `roots`, returning the number of frames written.
fn frame_lines(out: &mut String, roots: &[Frame]) -> usize
{
    let mut written = 0;
    let mut pending: Vec<(&Frame, usize)> = roots.iter().rev().map(|frame| (frame, 0)).collect();

    while let Some((frame, depth)) = pending.pop() {
        frame_line(out, frame, depth, written);
        written += 1;
        pending.extend(frame.children().iter().rev().map(|child| (child, depth + 1)));
    }
    written
}

fn frame_line(out: &mut String, frame: &Frame, depth: usize, index: usize)
{
    let binary = match (&frame.binary_name, frame.binary_id) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => id.to_string(),
        (None, None) => "???".to_string(),
    };
    let symbol = frame.primary_symbol().map_or_else(|| "???".to_string(), describe_symbol);

    let _ = writeln!(
        out,
        "    {:indent$}{:<4}{:<32} {:#018x} {}",
        "",
        index,
        binary,
        frame.address,
        symbol,
        indent = depth * 2
    );
}

fn describe_symbol(symbol: &SymbolInfo) -> String
{
    let mut text = symbol.display_name().to_string();
    if let Some(offset) = symbol.offset {
        let _ = write!(text, " + {offset}");
    }
    if let Some(file) = &symbol.file {
        match symbol.line {
            Some(line) => {
                let _ = write!(text, " ({file}:{line})");
            }
            None => {
                let _ = write!(text, " ({file})");
            }
        }
    }
    text
}

#[cfg(test)]
mod tests
{
    use uuid::Uuid;

    use super::*;

    fn tree() -> CallStackTree
    {
        let leaf = Frame::new(0x1010)
            .with_binary(Uuid::from_u128(7), 0x10, Some("App".into()))
            .with_children(vec![Frame::new(0x20)]);
        CallStackTree::new(vec![CallStack::new(Some(true), vec![leaf])], true)
    }

    #[test]
    fn test_describe_symbol()
    {
        let symbol = SymbolInfo::new("_main").with_offset(4).with_location("main.rs", Some(9));
        assert_eq!(describe_symbol(&symbol), "_main + 4 (main.rs:9)");
        assert_eq!(describe_symbol(&SymbolInfo::new("start")), "start");
    }

    #[test]
    fn test_frame_lines_indent_children()
    {
        let mut out = String::new();
        let written = frame_lines(&mut out, &tree().call_stacks[0].root_frames);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("    0   App"));
        assert!(lines[1].starts_with("      1   ???"));
        assert_eq!(written, 2);
    }

    #[test]
    fn test_frame_lines_deep_chain()
    {
        let mut chain = Frame::new(0);
        for address in 1..=1_000 {
            chain = Frame::new(address).with_children(vec![chain]);
        }

        let mut out = String::new();
        assert_eq!(frame_lines(&mut out, &[chain]), 1_001);
        assert!(out.lines().last().unwrap().trim_start().starts_with("1000"));
    }
}
