//! Call stack and call stack tree types.

use serde::{Deserialize, Serialize};

use super::frame::Frame;
use crate::error::Result;

/// One logical stack: a thread's frames or one sampling stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStack
{
    /// Marks the stack whose thread caused a crash.
    ///
    /// Only crash diagnostics set this; sample-only kinds leave it absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_attributed: Option<bool>,
    #[serde(rename = "callStackRootFrames")]
    pub root_frames: Vec<Frame>,
}

impl CallStack
{
    pub fn new(thread_attributed: Option<bool>, root_frames: Vec<Frame>) -> Self
    {
        Self {
            thread_attributed,
            root_frames,
        }
    }

    /// All frames, root-first, each root followed by its descendants.
    ///
    /// Index 0 is the innermost (most recent) call.
    pub fn frames(&self) -> Vec<&Frame>
    {
        let mut out = Vec::new();
        for root in &self.root_frames {
            out.push(root);
            out.extend(root.flattened_frames());
        }
        out
    }

    /// `true` when this stack's thread caused the crash.
    pub fn is_attributed(&self) -> bool
    {
        self.thread_attributed == Some(true)
    }

    pub fn is_simulated(&self) -> bool
    {
        self.root_frames.first().is_some_and(Frame::is_simulated)
    }
}

/// All call stacks captured in one sampling snapshot.
///
/// With `call_stack_per_thread` set, each [`CallStack`] is one OS thread's
/// stack. Otherwise the stacks together form one merged sampled tree (for
/// example a CPU-time histogram across every thread).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStackTree
{
    pub call_stacks: Vec<CallStack>,
    pub call_stack_per_thread: bool,
}

impl CallStackTree
{
    pub fn new(call_stacks: Vec<CallStack>, call_stack_per_thread: bool) -> Self
    {
        Self {
            call_stacks,
            call_stack_per_thread,
        }
    }

    /// Decode a standalone call stack tree.
    ///
    /// ## Errors
    ///
    /// Returns [`crate::SymtreeError::Decode`] for malformed JSON or a frame
    /// without an `address`.
    pub fn from_json(data: &[u8]) -> Result<Self>
    {
        Ok(crate::nesting::from_slice(data)?)
    }

    /// Encode back to the wire representation.
    ///
    /// ## Errors
    ///
    /// Only fails if serialization itself fails, which the model never triggers.
    pub fn to_json(&self) -> Result<Vec<u8>>
    {
        Ok(serde_json::to_vec(self)?)
    }

    /// Every frame of every call stack, in stack order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame>
    {
        self.call_stacks.iter().flat_map(CallStack::frames)
    }

    /// The call stack of the crashing thread, if one is marked.
    pub fn attributed_call_stack(&self) -> Option<&CallStack>
    {
        self.call_stacks.iter().find(|stack| stack.is_attributed())
    }

    pub fn is_simulated(&self) -> bool
    {
        self.call_stacks.first().is_some_and(CallStack::is_simulated)
    }
}
