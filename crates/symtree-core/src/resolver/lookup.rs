//! Loaded-image lookup.

use std::ops::Range;

use uuid::Uuid;

/// An image mapped into a live process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadedImage
{
    pub id: Uuid,
    pub load_address: u64,
    pub size: u64,
    pub name: Option<String>,
}

impl LoadedImage
{
    pub fn new(id: Uuid, load_address: u64, size: u64, name: Option<String>) -> Self
    {
        Self {
            id,
            load_address,
            size,
            name,
        }
    }

    pub fn address_range(&self) -> Range<u64>
    {
        self.load_address..self.load_address.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool
    {
        self.address_range().contains(&address)
    }
}

/// Finds images of the running process.
///
/// Used to attach binary identity to raw return addresses and to rebase
/// payload addresses onto a live image.
pub trait ImageLookup
{
    fn image_with_id(&self, id: Uuid) -> Option<LoadedImage>;

    fn image_containing(&self, address: u64) -> Option<LoadedImage>;
}

impl<L> ImageLookup for &L
where
    L: ImageLookup + ?Sized,
{
    fn image_with_id(&self, id: Uuid) -> Option<LoadedImage>
    {
        (**self).image_with_id(id)
    }

    fn image_containing(&self, address: u64) -> Option<LoadedImage>
    {
        (**self).image_containing(address)
    }
}

/// Fixed, in-memory image list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticImageLookup
{
    images: Vec<LoadedImage>,
}

impl StaticImageLookup
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, image: LoadedImage) -> Self
    {
        self.add(image);
        self
    }

    /// Register an image, replacing any previous image with the same id.
    pub fn add(&mut self, image: LoadedImage)
    {
        self.images.retain(|existing| existing.id != image.id);
        self.images.push(image);
    }

    pub fn images(&self) -> &[LoadedImage]
    {
        &self.images
    }
}

impl FromIterator<LoadedImage> for StaticImageLookup
{
    fn from_iter<I: IntoIterator<Item = LoadedImage>>(iter: I) -> Self
    {
        let mut lookup = Self::new();
        for image in iter {
            lookup.add(image);
        }
        lookup
    }
}

impl ImageLookup for StaticImageLookup
{
    fn image_with_id(&self, id: Uuid) -> Option<LoadedImage>
    {
        self.images.iter().find(|image| image.id == id).cloned()
    }

    fn image_containing(&self, address: u64) -> Option<LoadedImage>
    {
        self.images.iter().find(|image| image.contains(address)).cloned()
    }
}
