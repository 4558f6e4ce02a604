//! Exception backtraces captured inside the crashing process.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resolver::ImageLookup;
use crate::types::{AddressingMode, Frame};

/// A language exception and the backtrace it was raised with.
///
/// Crash payloads only carry sampled stacks. When the process records its
/// own exception before dying, the backtrace is attached here, in the same
/// frame-tree shape as the sampled stacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo
{
    pub name: String,
    pub reason: String,
    pub backtrace: Vec<Frame>,
}

impl ExceptionInfo
{
    pub fn new(name: impl Into<String>, reason: impl Into<String>, backtrace: Vec<Frame>) -> Self
    {
        Self {
            name: name.into(),
            reason: reason.into(),
            backtrace,
        }
    }

    /// Build the backtrace from raw return addresses, innermost first.
    ///
    /// The result is a single linear chain: the first address becomes the
    /// root frame and every following address the only child of the one
    /// before it. Addresses that `images` can place are attributed to their
    /// image, with the stored offset written the way `mode` expects.
    /// An empty address list produces a single frame at address 0.
    pub fn from_return_addresses<L>(
        name: impl Into<String>,
        reason: impl Into<String>,
        addresses: &[u64],
        images: &L,
        mode: AddressingMode,
    ) -> Self
    where
        L: ImageLookup + ?Sized,
    {
        let mut chain: Option<Frame> = None;

        for &address in addresses.iter().rev() {
            let mut frame = Frame::new(address);
            if let Some(image) = images.image_containing(address) {
                let stored = mode.stored_value(address, image.load_address);
                frame = frame.with_binary(image.id, stored, image.name);
            }
            if let Some(older) = chain.take() {
                frame = frame.with_children(vec![older]);
            }
            chain = Some(frame);
        }

        Self::new(name, reason, vec![chain.unwrap_or_else(|| Frame::new(0))])
    }

    /// Encode as standalone JSON.
    ///
    /// ## Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> Result<Vec<u8>>
    {
        Ok(serde_json::to_vec(self)?)
    }
}
