//! On-disk symbol resolution.
//!
//! [`DwarfResolver`] reads images with `object`, resolves addresses through
//! DWARF line tables with `addr2line` (inline frames included) and falls back
//! to the image's symbol table when an address has no debug information.
//!
//! Images are registered up front by path. Their identifier comes from the
//! Mach-O `LC_UUID` load command or the first 16 bytes of an ELF build id,
//! or is supplied by the caller. Frames are matched to images by that
//! identifier, then by file name.
//!
//! ## Address translation
//!
//! A payload address is rebased onto the image's own virtual address space:
//!
//! ```text
//! file_address = text_vmaddr + (address - target.load_address)
//! ```
//!
//! where `text_vmaddr` is the `__TEXT` segment address for Mach-O images and
//! the lowest segment address otherwise.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::demangle::{demangle_symbol, strip_macho_underscore};
use super::{SymbolResolver, SymbolicationTarget};
use crate::error::{Result, SymtreeError};
use crate::types::SymbolInfo;

type OwnedReader = EndianArcSlice<RunTimeEndian>;

const DWARF_SECTIONS: &[(&str, &[&str])] = &[
    (".debug_abbrev", &[".debug_abbrev", "__debug_abbrev"]),
    (".debug_addr", &[".debug_addr", "__debug_addr"]),
    (".debug_info", &[".debug_info", "__debug_info"]),
    (".debug_line", &[".debug_line", "__debug_line"]),
    (".debug_line_str", &[".debug_line_str", "__debug_line_str"]),
    (".debug_ranges", &[".debug_ranges", "__debug_ranges"]),
    (".debug_rnglists", &[".debug_rnglists", "__debug_rnglists"]),
    (".debug_str", &[".debug_str", "__debug_str"]),
    (".debug_str_offsets", &[".debug_str_offsets", "__debug_str_offsets"]),
    (".debug_types", &[".debug_types", "__debug_types"]),
    (".debug_loc", &[".debug_loc", "__debug_loc"]),
    (".debug_loclists", &[".debug_loclists", "__debug_loclists"]),
];

/// Resolves addresses against images read from disk.
///
/// Parsed images are cached for the lifetime of the resolver; registering the
/// same path twice reuses the parsed image.
///
/// ## Example
///
/// ```rust,no_run
/// use symtree_core::resolver::{DwarfResolver, SymbolResolver, SymbolicationTarget};
///
/// fn main() -> symtree_core::Result<()>
/// {
///     let mut resolver = DwarfResolver::new();
///     let id = resolver.add_image("/path/to/MyApp.app.dSYM/Contents/Resources/DWARF/MyApp")?;
///
///     let target = SymbolicationTarget::new(id, 0x1_0000_0000, Some("MyApp".into()));
///     for symbol in resolver.resolve(0x1_0000_4242, &target) {
///         println!("{symbol}");
///     }
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct DwarfResolver
{
    images: HashMap<Uuid, Arc<ObjectImage>>,
    by_path: HashMap<PathBuf, Arc<ObjectImage>>,
}

impl DwarfResolver
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register the image at `path` under the identifier it carries.
    ///
    /// ## Errors
    ///
    /// - [`SymtreeError::Io`] when the file cannot be read
    /// - [`SymtreeError::ImageParse`] when it is not an object file
    /// - [`SymtreeError::MissingImageId`] when it carries no UUID or build id
    pub fn add_image(&mut self, path: impl AsRef<Path>) -> Result<Uuid>
    {
        let image = self.load(path.as_ref(), None)?;
        let id = image.id;
        self.images.insert(id, image);
        Ok(id)
    }

    /// Register the image at `path` under an explicit identifier.
    ///
    /// ## Errors
    ///
    /// Same as [`DwarfResolver::add_image`], except that a missing embedded
    /// identifier is not an error.
    pub fn add_image_with_id(&mut self, path: impl AsRef<Path>, id: Uuid) -> Result<()>
    {
        let image = self.load(path.as_ref(), Some(id))?;
        self.images.insert(id, image);
        Ok(())
    }

    pub fn image_ids(&self) -> impl Iterator<Item = Uuid> + '_
    {
        self.images.keys().copied()
    }

    pub fn len(&self) -> usize
    {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.images.is_empty()
    }

    fn load(&mut self, path: &Path, id: Option<Uuid>) -> Result<Arc<ObjectImage>>
    {
        let canonical = path.canonicalize()?;

        if let Some(existing) = self.by_path.get(&canonical) {
            if id.map_or(true, |id| id == existing.id) {
                return Ok(existing.clone());
            }
        }

        let image = Arc::new(ObjectImage::parse(&canonical, id)?);
        debug!(
            id = %image.id,
            path = %canonical.display(),
            text_vmaddr = format_args!("{:#x}", image.text_vmaddr),
            size = image.size,
            symbols = image.symbols.len(),
            "registered image"
        );
        self.by_path.insert(canonical, image.clone());
        Ok(image)
    }

    fn image_for(&self, target: &SymbolicationTarget) -> Option<&ObjectImage>
    {
        if let Some(image) = self.images.get(&target.binary_id) {
            return Some(image.as_ref());
        }

        let name = target.path.as_deref().map(file_name)?;
        self.images.values().find(|image| image.file_name() == name).map(Arc::as_ref)
    }
}

impl SymbolResolver for DwarfResolver
{
    fn resolve(&self, address: u64, target: &SymbolicationTarget) -> Vec<SymbolInfo>
    {
        let Some(image) = self.image_for(target) else {
            trace!(binary_id = %target.binary_id, "no registered image");
            return Vec::new();
        };

        let Some(file_address) = target
            .relative_address(address)
            .and_then(|relative| image.text_vmaddr.checked_add(relative))
        else {
            trace!(address, load_address = target.load_address, "address below load address");
            return Vec::new();
        };

        let symbols = image.symbolicate(file_address);
        if symbols.is_empty() {
            trace!(
                binary_id = %target.binary_id,
                file_address = format_args!("{file_address:#x}"),
                "address not resolved"
            );
        }
        symbols
    }
}

#[derive(Debug, Clone)]
struct TextSymbol
{
    address: u64,
    size: u64,
    name: String,
}

enum ContextState
{
    Pending,
    Ready(Box<Context<OwnedReader>>),
    Unavailable,
}

/// A parsed image: its DWARF sections and text symbols.
struct ObjectImage
{
    id: Uuid,
    path: PathBuf,
    endian: RunTimeEndian,
    text_vmaddr: u64,
    size: u64,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    /// Sorted by address.
    symbols: Vec<TextSymbol>,
    context: Mutex<ContextState>,
}

impl ObjectImage
{
    fn parse(path: &Path, id: Option<Uuid>) -> Result<Self>
    {
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes).map_err(|err| parse_error(path, err))?;

        let id = match id {
            Some(id) => id,
            None => embedded_id(&file).ok_or_else(|| SymtreeError::MissingImageId(path.to_path_buf()))?,
        };

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let text_vmaddr = file
            .segments()
            .find(|segment| matches!(segment.name(), Ok(Some("__TEXT"))))
            .map(|segment| segment.address())
            .or_else(|| file.segments().map(|segment| segment.address()).min())
            .unwrap_or(0);

        let end = file
            .segments()
            .map(|segment| segment.address().saturating_add(segment.size()))
            .max()
            .unwrap_or(text_vmaddr);

        let mut debug_sections = HashMap::new();
        for (canonical, aliases) in DWARF_SECTIONS {
            if let Some(data) = section_bytes(&file, aliases).map_err(|err| parse_error(path, err))? {
                debug_sections.insert(*canonical, data);
            }
        }

        Ok(Self {
            id,
            path: path.to_path_buf(),
            endian,
            text_vmaddr,
            size: end.saturating_sub(text_vmaddr),
            debug_sections,
            symbols: text_symbols(&file),
            context: Mutex::new(ContextState::Pending),
        })
    }

    fn file_name(&self) -> &str
    {
        self.path.to_str().map_or("", file_name)
    }

    fn symbolicate(&self, file_address: u64) -> Vec<SymbolInfo>
    {
        let symbol = self.symbol_containing(file_address);
        let mut frames = self.dwarf_frames(file_address);

        if frames.is_empty() {
            return symbol
                .map(|symbol| vec![symbol_info(symbol, file_address)])
                .unwrap_or_default();
        }

        // The outermost entry is the real function; only it gets an offset.
        if let (Some(outer), Some(symbol)) = (frames.last_mut(), symbol) {
            outer.offset = file_address.checked_sub(symbol.address);
        }
        frames.into_vec()
    }

    fn symbol_containing(&self, file_address: u64) -> Option<&TextSymbol>
    {
        let index = self.symbols.partition_point(|symbol| symbol.address <= file_address);
        let symbol = self.symbols.get(index.checked_sub(1)?)?;

        let within = symbol.size == 0 || file_address < symbol.address.saturating_add(symbol.size);
        within.then_some(symbol)
    }

    fn dwarf_frames(&self, file_address: u64) -> SmallVec<[SymbolInfo; 4]>
    {
        let mut frames = SmallVec::new();

        let Ok(mut state) = self.context.lock() else {
            return frames;
        };

        if matches!(*state, ContextState::Pending) {
            *state = match self.build_context() {
                Ok(context) => ContextState::Ready(Box::new(context)),
                Err(err) => {
                    warn!(path = %self.path.display(), %err, "no usable DWARF, using symbol table only");
                    ContextState::Unavailable
                }
            };
        }

        let ContextState::Ready(context) = &*state else {
            return frames;
        };

        let Ok(mut iter) = context.find_frames(file_address).skip_all_loads() else {
            return frames;
        };

        while let Ok(Some(frame)) = iter.next() {
            let Some(raw) = frame
                .function
                .as_ref()
                .and_then(|function| function.raw_name().ok())
                .map(|raw| raw.into_owned())
            else {
                continue;
            };

            let mut info = SymbolInfo::new(raw.as_str());
            if let Some(demangled) = demangle_symbol(&raw) {
                info = info.with_demangled(demangled);
            }
            if let Some(location) = &frame.location {
                if let Some(file) = location.file {
                    info = info.with_location(file, location.line);
                }
            }
            frames.push(info);
        }

        frames
    }

    fn build_context(&self) -> std::result::Result<Context<OwnedReader>, String>
    {
        if !self.debug_sections.contains_key(".debug_info") {
            return Err("image has no .debug_info section".to_string());
        }

        let dwarf = Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| format!("failed to load DWARF: {err}"))?;
        Context::from_dwarf(dwarf).map_err(|err| format!("failed to build addr2line context: {err}"))
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> SymtreeError
{
    SymtreeError::ImageParse {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}

fn file_name(path: &str) -> &str
{
    path.rsplit('/').next().unwrap_or(path)
}

fn embedded_id(file: &object::File<'_>) -> Option<Uuid>
{
    if let Ok(Some(uuid)) = file.mach_uuid() {
        return Some(Uuid::from_bytes(uuid));
    }

    let build_id = file.build_id().ok().flatten()?;
    let bytes: [u8; 16] = build_id.get(..16)?.try_into().ok()?;
    Some(Uuid::from_bytes(bytes))
}

fn section_bytes(file: &object::File<'_>, names: &[&str]) -> object::Result<Option<Arc<[u8]>>>
{
    for name in names {
        if let Some(section) = file.section_by_name(name) {
            let data = match section.uncompressed_data()? {
                Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
                Cow::Owned(vec) => vec.into(),
            };
            return Ok(Some(data));
        }
    }

    Ok(None)
}

fn text_symbols(file: &object::File<'_>) -> Vec<TextSymbol>
{
    let is_macho = matches!(file.format(), object::BinaryFormat::MachO);

    let mut symbols: Vec<TextSymbol> = file
        .symbols()
        .chain(file.dynamic_symbols())
        .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition() && symbol.address() != 0)
        .filter_map(|symbol| {
            let name = symbol.name().ok().filter(|name| !name.is_empty())?;
            let name = if is_macho { strip_macho_underscore(name) } else { name };
            Some(TextSymbol {
                address: symbol.address(),
                size: symbol.size(),
                name: name.to_string(),
            })
        })
        .collect();

    symbols.sort_by_key(|symbol| symbol.address);
    symbols.dedup_by_key(|symbol| symbol.address);
    symbols
}

fn symbol_info(symbol: &TextSymbol, file_address: u64) -> SymbolInfo
{
    let mut info = SymbolInfo::new(symbol.name.as_str());
    if let Some(demangled) = demangle_symbol(&symbol.name) {
        info = info.with_demangled(demangled);
    }
    match file_address.checked_sub(symbol.address) {
        Some(offset) => info.with_offset(offset),
        None => info,
    }
}
