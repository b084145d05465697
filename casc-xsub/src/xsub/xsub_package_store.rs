use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt};
use glob::glob;
use tracing::{debug, info, trace, warn};

use crate::casc_storage::CascStorage;
use crate::error::CascError;
use crate::ext::io_ext::ReadExt;
use crate::utility::bit_packing::align_up;
use crate::xsub::lz_decompressor::LzDecompressor;
use crate::xsub::xsub_block::{XSubBlock, XSubCompressionType};
use crate::xsub::xsub_hash_entry::XSubHashEntry;
use crate::xsub::xsub_header::{XSubHeader, XSUB_ASSET_TYPE, XSUB_MAGIC};

/// Output buffer size used when the caller does not know the decompressed size.
pub const DEFAULT_BUFFER_SIZE: usize = 0x240_0000;
/// Block groups start on this boundary.
const BLOCK_GROUP_ALIGNMENT: u64 = 0x80;
/// Offset of the key marker within the first block group.
const KEY_MARKER_OFFSET: u64 = 2;
/// Offset of the block count within a block group.
const BLOCK_COUNT_OFFSET: u64 = 22;

/// An object read from a package: its decoded blocks, or the raw region when the key
/// marker is missing.
enum Extraction {
    Decoded(Vec<u8>),
    Raw(Vec<u8>),
}

/// Where a registered package is read from.
#[derive(Debug, Clone)]
pub enum PackageLocation {
    /// A package file on disk.
    Loose(PathBuf),
    /// A logical file of a CASC storage.
    Casc(Arc<CascStorage>, String),
}

impl PackageLocation {
    fn name(&self) -> String {
        match self {
            PackageLocation::Loose(path) => path.display().to_string(),
            PackageLocation::Casc(_, name) => name.clone(),
        }
    }
}

/// Location of an object inside a registered package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XSubCacheObject {
    /// Offset of the object's first block group.
    pub offset: u64,
    /// Size of the compressed region, block group headers included.
    pub compressed_size: u64,
    /// Index of the package in registration order.
    pub package_index: usize,
}

/// Maps 64-bit asset keys to objects in registered XSUB packages and decompresses them.
///
/// Packages are registered with [`add_package`](Self::add_package),
/// [`load_directory`](Self::load_directory) or [`add_casc_packages`](Self::add_casc_packages).
/// When several packages declare the same key, the one registered first wins. After
/// registration the store is read-only and [`extract`](Self::extract) may be called from
/// any thread.
pub struct XSubPackageStore {
    objects: HashMap<u64, XSubCacheObject>,
    packages: Vec<PackageLocation>,
    decompressor: Box<dyn LzDecompressor>,
}

impl std::fmt::Debug for XSubPackageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XSubPackageStore")
            .field("objects", &self.objects.len())
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl XSubPackageStore {
    /// Creates an empty store that decompresses Oodle blocks with `decompressor`.
    pub fn new<D: LzDecompressor + 'static>(decompressor: D) -> Self {
        Self {
            objects: HashMap::new(),
            packages: Vec::new(),
            decompressor: Box::new(decompressor),
        }
    }

    /// Registers a package file, returning the number of keys it declared.
    ///
    /// A package with a bad header is rejected and leaves the store unchanged.
    pub fn add_package<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, CascError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        let entries = Self::read_hash_table(&mut BufReader::new(file), length, true)?;
        Ok(self.register(PackageLocation::Loose(path.to_path_buf()), entries))
    }

    /// Registers every `*.xsub` file below `dir`, returning the number of packages accepted.
    pub fn load_directory<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        let pattern = dir.as_ref().join("**").join("*.xsub");
        let mut paths: Vec<PathBuf> = match glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
            Err(e) => {
                warn!("Invalid package pattern {}: {e}", pattern.display());
                return 0;
            }
        };
        paths.sort();

        let mut accepted = 0;
        for path in paths {
            match self.add_package(&path) {
                Ok(count) => {
                    debug!("Loaded {count} objects from {}", path.display());
                    accepted += 1;
                }
                Err(e) => warn!("Skipping package {}: {e}", path.display()),
            }
        }
        accepted
    }

    /// Registers every locally stored file of `storage` whose extension ends in `xsub`,
    /// returning the number of packages accepted.
    ///
    /// Packages stored in CASC are only checked for their magic and hash table offset; the
    /// package type is not required to be asset data.
    pub fn add_casc_packages(&mut self, storage: Arc<CascStorage>) -> usize {
        let names: Vec<String> = storage
            .files()
            .iter()
            .filter(|f| f.is_local && has_package_extension(&f.file_name))
            .map(|f| f.file_name.clone())
            .collect();

        let mut accepted = 0;
        for name in names {
            let result = storage.open_file(&name).and_then(|mut reader| {
                let length = reader.size();
                Self::read_hash_table(&mut reader, length, false)
            });
            match result {
                Ok(entries) => {
                    let location = PackageLocation::Casc(Arc::clone(&storage), name.clone());
                    let count = self.register(location, entries);
                    debug!("Loaded {count} objects from {name}");
                    accepted += 1;
                }
                Err(e) => warn!("Skipping package {name}: {e}"),
            }
        }
        accepted
    }

    /// Reads and validates a package header, then its hash table.
    fn read_hash_table<R: Read + Seek>(
        reader: &mut R,
        length: u64,
        require_asset_type: bool,
    ) -> Result<Vec<XSubHashEntry>, CascError> {
        reader.seek(SeekFrom::Start(0))?;
        let header = XSubHeader::read(reader)?;

        if header.magic != XSUB_MAGIC {
            return Err(CascError::UnsupportedFileType(format!(
                "Invalid XSUB magic {:#010X}",
                header.magic
            )));
        }
        if require_asset_type && header.package_type != XSUB_ASSET_TYPE {
            return Err(CascError::UnsupportedFileType(format!(
                "Unsupported XSUB package type {}",
                header.package_type
            )));
        }
        if header.hash_offset >= length {
            return Err(CascError::FileCorrupted(format!(
                "Hash table offset {:#x} is past the end of the package",
                header.hash_offset
            )));
        }
        let available = (length - header.hash_offset) / XSubHashEntry::SIZE as u64;
        if header.hash_count > available {
            return Err(CascError::FileCorrupted(format!(
                "Hash table declares {} entries, package holds {available}",
                header.hash_count
            )));
        }

        reader.seek(SeekFrom::Start(header.hash_offset))?;
        let entries = (0..header.hash_count)
            .map(|_| XSubHashEntry::read(reader))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(
            "XSUB version {} declares {} files, {} hashes",
            header.version,
            header.file_count,
            entries.len()
        );
        Ok(entries)
    }

    fn register(&mut self, location: PackageLocation, entries: Vec<XSubHashEntry>) -> usize {
        let package_index = self.packages.len();
        self.packages.push(location);

        let count = entries.len();
        for entry in entries {
            self.objects.entry(entry.key).or_insert(XSubCacheObject {
                offset: entry.offset(),
                compressed_size: entry.compressed_size(),
                package_index,
            });
        }
        count
    }

    pub fn get(&self, key: u64) -> Option<&XSubCacheObject> {
        self.objects.get(&key)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.objects.contains_key(&key)
    }

    /// The number of distinct keys.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn packages(&self) -> &[PackageLocation] {
        &self.packages
    }

    /// Decompresses the object stored under `key`.
    ///
    /// The returned buffer is `expected_size` bytes long, or [`DEFAULT_BUFFER_SIZE`] when
    /// `expected_size` is zero. If the object does not start with its key marker, the raw
    /// compressed region is returned as is.
    pub fn extract(&self, key: u64, expected_size: usize) -> Result<Vec<u8>, CascError> {
        let object = self
            .objects
            .get(&key)
            .ok_or_else(|| CascError::FileNotFound(format!("XSUB key {key:#018X}")))?;
        let location = self.packages.get(object.package_index).ok_or_else(|| {
            CascError::InvalidData(format!("Package {} not registered", object.package_index))
        })?;

        let started = Instant::now();
        let extraction = match location {
            PackageLocation::Loose(path) => {
                let mut reader = BufReader::new(File::open(path)?);
                self.extract_from(&mut reader, key, object, expected_size)?
            }
            PackageLocation::Casc(storage, name) => {
                let mut reader = storage.open_file(name)?;
                self.extract_from(&mut reader, key, object, expected_size)?
            }
        };

        let elapsed = started.elapsed().as_millis();
        match extraction {
            Extraction::Decoded(data) => {
                info!(
                    "Decompressed {key:#018X} from {} in {elapsed}ms. Buffer size: {}",
                    location.name(),
                    data.len()
                );
                Ok(data)
            }
            Extraction::Raw(data) => {
                debug!(
                    "Read {} raw bytes of {key:#018X} from {} in {elapsed}ms",
                    data.len(),
                    location.name()
                );
                Ok(data)
            }
        }
    }

    fn extract_from<R: Read + Seek>(
        &self,
        reader: &mut R,
        key: u64,
        object: &XSubCacheObject,
        expected_size: usize,
    ) -> Result<Extraction, CascError> {
        let block_end = object.offset + object.compressed_size;

        reader.seek(SeekFrom::Start(object.offset + KEY_MARKER_OFFSET))?;
        let marker = reader.read_u64::<LittleEndian>()?;
        if marker != key {
            warn!("Key marker {marker:#018X} does not match {key:#018X}, returning raw data");
            reader.seek(SeekFrom::Start(object.offset))?;
            let raw = reader.read_bytes(object.compressed_size as usize)?;
            return Ok(Extraction::Raw(raw));
        }

        let buffer_size = if expected_size > 0 {
            expected_size
        } else {
            DEFAULT_BUFFER_SIZE
        };
        let mut buffer = vec![0u8; buffer_size];
        let mut group_position = object.offset;

        while reader.stream_position()? < block_end {
            reader.seek(SeekFrom::Start(group_position + BLOCK_COUNT_OFFSET))?;
            let block_count = reader.read_u8()?;
            let blocks = (0..block_count)
                .map(|_| XSubBlock::read(reader))
                .collect::<Result<Vec<_>, _>>()?;

            for block in &blocks {
                reader.seek(SeekFrom::Start(group_position + block.block_offset as u64))?;
                let compressed = reader.read_bytes(block.compressed_size as usize)?;
                self.decode_block(block, &compressed, &mut buffer)?;
            }

            group_position = align_up(reader.stream_position()?, BLOCK_GROUP_ALIGNMENT);
        }
        Ok(Extraction::Decoded(buffer))
    }

    fn decode_block(
        &self,
        block: &XSubBlock,
        compressed: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), CascError> {
        match block.compression() {
            XSubCompressionType::Oodle => {
                let start = block.decompressed_offset as usize;
                let end = start + block.decompressed_size as usize;
                let buffer_len = buffer.len();
                let output = buffer.get_mut(start..end).ok_or_else(|| {
                    CascError::Decompression(format!(
                        "Block output {start:#x}..{end:#x} exceeds buffer of {buffer_len:#x} bytes"
                    ))
                })?;
                let written = self.decompressor.decompress(compressed, output)?;
                if written != block.decompressed_size as usize {
                    return Err(CascError::Decompression(format!(
                        "Block decompressed to {written} bytes, expected {}",
                        block.decompressed_size
                    )));
                }
            }
            XSubCompressionType::Unknown(kind) => {
                warn!("Unknown compression type {kind}, leaving block empty");
            }
        }
        Ok(())
    }
}

fn has_package_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.to_ascii_lowercase().ends_with("xsub"))
}
