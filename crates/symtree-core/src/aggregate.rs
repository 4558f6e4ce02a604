//! # Binary Image Aggregation
//!
//! Collects the distinct binaries referenced by a call stack tree.
//!
//! The same binary shows up in many frames at many addresses. Each frame
//! yields a [`Binary`] whose size reaches just past that frame's address, so
//! when two frames name the same binary the larger size wins: the highest
//! observed address is the best estimate the payload allows.

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::{AddressingMode, Binary, CallStackTree, Frame};

/// Accumulates binaries keyed by id, keeping the largest size seen.
#[derive(Debug, Default, Clone)]
pub struct BinaryImageSet
{
    images: HashMap<Uuid, Binary>,
}

impl BinaryImageSet
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Merge one binary. On an id collision the larger `approximate_size`
    /// is kept; on a tie the binary seen first stays.
    pub fn insert(&mut self, binary: Binary)
    {
        match self.images.get_mut(&binary.id) {
            Some(existing) if existing.approximate_size >= binary.approximate_size => {}
            Some(existing) => *existing = binary,
            None => {
                self.images.insert(binary.id, binary);
            }
        }
    }

    /// Derive and merge the binary of every frame in `tree`.
    pub fn extend_from_tree(&mut self, tree: &CallStackTree, mode: AddressingMode)
    {
        self.extend_from_frames(tree.frames(), mode);
    }

    pub fn extend_from_frames<'a>(&mut self, frames: impl IntoIterator<Item = &'a Frame>, mode: AddressingMode)
    {
        for frame in frames {
            if let Some(binary) = frame.binary(mode) {
                self.insert(binary);
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&Binary>
    {
        self.images.get(id)
    }

    pub fn len(&self) -> usize
    {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.images.is_empty()
    }

    /// The binaries, ordered by load address then id.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<Binary>
    {
        let mut images: Vec<Binary> = self.images.into_values().collect();
        images.sort_by(|a, b| a.load_address.cmp(&b.load_address).then_with(|| a.id.cmp(&b.id)));
        images
    }
}

impl Extend<Binary> for BinaryImageSet
{
    fn extend<I: IntoIterator<Item = Binary>>(&mut self, iter: I)
    {
        for binary in iter {
            self.insert(binary);
        }
    }
}

impl CallStackTree
{
    /// Distinct binaries referenced by this tree, one per id.
    ///
    /// `mode` must come from the owning diagnostic's OS version.
    #[must_use]
    pub fn binary_images(&self, mode: AddressingMode) -> Vec<Binary>
    {
        let mut set = BinaryImageSet::new();
        set.extend_from_tree(self, mode);
        set.into_sorted_vec()
    }
}
