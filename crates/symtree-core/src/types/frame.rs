//! Sampled frame tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::binary::{uppercase_uuid, AddressingMode, Binary};
use super::symbols::SymbolInfo;

/// Binary name Xcode writes into simulated diagnostic payloads.
pub const SIMULATED_BINARY_NAME: &str = "testBinaryName";

/// One sampled program-counter position and the older positions sampled under it.
///
/// `children` are deeper (older) stack positions; `None` marks a leaf.
/// `address` is always the absolute instruction or return address captured by
/// the sampler. The binary fields are optional because not every sample can
/// be attributed to an image.
///
/// `binary_offset` is NOT a load address on every platform; interpret it
/// through an [`AddressingMode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame
{
    #[serde(
        rename = "binaryUUID",
        with = "uppercase_uuid::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_id: Option<Uuid>,
    #[serde(
        rename = "offsetIntoBinaryTextSegment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_name: Option<String>,
    pub address: u64,
    #[serde(
        rename = "subFrames",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::nesting::serialize_children"
    )]
    pub children: Option<Vec<Frame>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_info: Option<Vec<SymbolInfo>>,
}

impl Frame
{
    /// Anonymous leaf frame at `address`.
    pub fn new(address: u64) -> Self
    {
        Self {
            binary_id: None,
            binary_offset: None,
            sample_count: None,
            binary_name: None,
            address,
            children: None,
            symbol_info: None,
        }
    }

    /// Attribute the frame to a binary.
    #[must_use]
    pub fn with_binary(mut self, id: Uuid, offset: u64, name: Option<String>) -> Self
    {
        self.binary_id = Some(id);
        self.binary_offset = Some(offset);
        self.binary_name = name;
        self
    }

    #[must_use]
    pub fn with_sample_count(mut self, count: u32) -> Self
    {
        self.sample_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Frame>) -> Self
    {
        self.children = Some(children);
        self
    }

    /// Direct children, empty for a leaf.
    pub fn children(&self) -> &[Frame]
    {
        self.children.as_deref().unwrap_or_default()
    }

    /// Every descendant, depth-first, each child followed by its own descendants.
    ///
    /// `self` is not included.
    pub fn flattened_frames(&self) -> Vec<&Frame>
    {
        let mut out = Vec::new();
        let mut pending: Vec<&Frame> = self.children().iter().rev().collect();
        while let Some(frame) = pending.pop() {
            out.push(frame);
            pending.extend(frame.children().iter().rev());
        }
        out
    }

    /// Derive the binary this frame was sampled in.
    ///
    /// Requires both `binary_id` and `binary_offset`. Never fails otherwise;
    /// a load address above `address` produces a degenerate binary of size 1.
    pub fn binary(&self, mode: AddressingMode) -> Option<Binary>
    {
        let id = self.binary_id?;
        let stored = self.binary_offset?;
        let load_address = mode.load_address(self.address, stored);

        Some(Binary::spanning(id, load_address, self.address, self.binary_name.clone()))
    }

    /// Symbol annotations attached by a symbolication pass.
    pub fn symbols(&self) -> &[SymbolInfo]
    {
        self.symbol_info.as_deref().unwrap_or_default()
    }

    /// Primary resolved symbol, if any.
    pub fn primary_symbol(&self) -> Option<&SymbolInfo>
    {
        self.symbols().first()
    }

    /// `true` for frames from Xcode's simulated payloads.
    pub fn is_simulated(&self) -> bool
    {
        self.binary_name.as_deref() == Some(SIMULATED_BINARY_NAME)
    }
}
