//! Binary image identity.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a frame's stored binary offset relates to its binary's load address.
///
/// The `offsetIntoBinaryTextSegment` field changed meaning across OS
/// releases. Older releases store the absolute load address of the binary in
/// it; newer releases store a true offset (`address - load_address`).
///
/// The mode is decided once per diagnostic from its OS version string (see
/// [`crate::reconcile`]) and threaded through every derivation for that
/// diagnostic. Frames carry no version information themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressingMode
{
    /// The stored value is the binary's load address (legacy releases).
    LoadAddress,
    /// The stored value is `address - load_address` (current releases).
    #[default]
    Offset,
}

impl AddressingMode
{
    /// Build a mode from the boolean "offset is load address" flag.
    #[must_use]
    pub const fn from_offset_is_load_address(flag: bool) -> Self
    {
        if flag {
            AddressingMode::LoadAddress
        } else {
            AddressingMode::Offset
        }
    }

    /// `true` for [`AddressingMode::LoadAddress`].
    #[must_use]
    pub const fn offset_is_load_address(self) -> bool
    {
        matches!(self, AddressingMode::LoadAddress)
    }

    /// Resolve the load address of the binary containing `address`.
    ///
    /// A stored offset larger than the address yields a wrapped (degenerate)
    /// load address rather than an error.
    #[must_use]
    pub const fn load_address(self, address: u64, stored: u64) -> u64
    {
        match self {
            AddressingMode::LoadAddress => stored,
            AddressingMode::Offset => address.wrapping_sub(stored),
        }
    }

    /// Value to store in a frame for a binary loaded at `load_address`.
    #[must_use]
    pub const fn stored_value(self, address: u64, load_address: u64) -> u64
    {
        match self {
            AddressingMode::LoadAddress => load_address,
            AddressingMode::Offset => address.wrapping_sub(load_address),
        }
    }
}

/// An executable or library image referenced by sampled frames.
///
/// The payload never reports an image's size. `approximate_size` is inferred
/// from the highest address observed inside the image, so it only ever grows
/// as more frames are seen (see [`crate::aggregate`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binary
{
    /// Stable image identifier (Mach-O `LC_UUID`).
    #[serde(rename = "uuid", with = "uppercase_uuid")]
    pub id: Uuid,
    /// Base address the image was mapped at.
    pub load_address: u64,
    /// `highest observed address - load_address + 1`.
    pub approximate_size: u64,
    /// Image name, when the sampler recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Binary
{
    pub fn new(id: Uuid, load_address: u64, approximate_size: u64, name: Option<String>) -> Self
    {
        Self {
            id,
            load_address,
            approximate_size,
            name,
        }
    }

    /// Build a binary whose size covers everything up to and including `address`.
    ///
    /// A load address above `address` is a degenerate but valid input; the
    /// size then bottoms out at 1.
    #[must_use]
    pub fn spanning(id: Uuid, load_address: u64, address: u64, name: Option<String>) -> Self
    {
        let approximate_size = address.saturating_sub(load_address).saturating_add(1);
        Self::new(id, load_address, approximate_size, name)
    }

    /// Addresses known to belong to this image.
    #[must_use]
    pub fn address_range(&self) -> Range<u64>
    {
        self.load_address..self.load_address.saturating_add(self.approximate_size)
    }

    #[must_use]
    pub fn contains(&self, address: u64) -> bool
    {
        self.address_range().contains(&address)
    }
}

/// Serialize UUIDs upper-case and hyphenated, the way diagnostic payloads spell them.
pub(crate) mod uppercase_uuid
{
    use serde::{Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S>(id: &Uuid, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut buffer = Uuid::encode_buffer();
        serializer.serialize_str(id.hyphenated().encode_upper(&mut buffer))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
    where
        D: Deserializer<'de>,
    {
        Uuid::deserialize(deserializer)
    }

    pub mod option
    {
        use serde::{Deserialize, Deserializer, Serializer};
        use uuid::Uuid;

        pub fn serialize<S>(id: &Option<Uuid>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match id {
                Some(id) => super::serialize(id, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<Uuid>::deserialize(deserializer)
        }
    }
}
