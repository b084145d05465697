use crate::content_key::ContentKey;
use crate::entry::Entry;
use crate::error::CascError;
use crate::ext::io_ext::{ReadExt, SeekExt};
use crate::index_store::IndexStore;
use crate::path_table_node_flags::PathTableNodeFlags;
use crate::utility::bit_packing::cft_offset_width;
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use tracing::debug;

/// `TVFS` as it appears at the start of a root file.
pub(crate) const TVFS_SIGNATURE: [u8; 4] = *b"TVFS";

/// Separator placed between path components.
pub const PATH_SEPARATOR: char = '\\';

/// Deepest folder nesting accepted in a path table.
const MAX_FOLDER_DEPTH: usize = 256;

/// Header size from which the max depth field is present.
const HEADER_SIZE_WITH_MAX_DEPTH: u8 = 38;

/// Represents the header of a TVFS root structure in a CASC archive.
///
/// This header contains metadata about the TVFS tables and their locations. All multi-byte
/// fields are big-endian.
#[derive(Debug, Clone)]
pub struct TVFSHeader {
    pub signature: [u8; 4],
    pub format_version: u8,
    pub header_size: u8,
    pub encoding_key_size: u8,
    pub patch_key_size: u8,
    pub flags: u32,
    pub path_table_offset: u32,
    pub path_table_size: u32,
    pub vfs_table_offset: u32,
    pub vfs_table_size: u32,
    pub cft_table_offset: u32,
    pub cft_table_size: u32,
    pub max_depth: u16,
}

impl TVFSHeader {
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature)?;
        let format_version = reader.read_u8()?;
        let header_size = reader.read_u8()?;
        Ok(Self {
            signature,
            format_version,
            header_size,
            encoding_key_size: reader.read_u8()?,
            patch_key_size: reader.read_u8()?,
            flags: reader.read_u32::<BigEndian>()?,
            path_table_offset: reader.read_u32::<BigEndian>()?,
            path_table_size: reader.read_u32::<BigEndian>()?,
            vfs_table_offset: reader.read_u32::<BigEndian>()?,
            vfs_table_size: reader.read_u32::<BigEndian>()?,
            cft_table_offset: reader.read_u32::<BigEndian>()?,
            cft_table_size: reader.read_u32::<BigEndian>()?,
            max_depth: if header_size >= HEADER_SIZE_WITH_MAX_DEPTH {
                reader.read_u16::<BigEndian>()?
            } else {
                0
            },
        })
    }
}

/// Represents a node in the TVFS path table.
///
/// Each node may represent a directory or file path component.
#[derive(Debug, Default, Clone)]
pub struct PathTableNode {
    pub name: String,
    pub flags: PathTableNodeFlags,
    pub value: Option<u32>,
}

/// The path table of a TVFS root, parsed into a map of logical paths.
#[derive(Debug)]
pub struct TVFSRootHandler {
    pub header: TVFSHeader,
    pub file_entries: HashMap<String, Entry>,
}

impl TVFSRootHandler {
    /// Parses a TVFS root from the start of `stream`.
    pub fn new<R: Read + Seek>(stream: &mut R) -> Result<Self, CascError> {
        stream.seek(SeekFrom::Start(0))?;
        let header = TVFSHeader::read(stream)?;

        if header.signature != TVFS_SIGNATURE {
            return Err(CascError::UnsupportedFileType(format!(
                "Invalid VFS header {:02X?}",
                header.signature
            )));
        }
        if header.encoding_key_size == 0 || header.encoding_key_size as usize > ContentKey::MAX_LEN {
            return Err(CascError::InvalidData(format!(
                "Invalid TVFS encoding key size {}",
                header.encoding_key_size
            )));
        }

        // Read tables into memory
        stream.seek(SeekFrom::Start(header.path_table_offset as u64))?;
        let path_table = stream.read_bytes(header.path_table_size as usize)?;

        stream.seek(SeekFrom::Start(header.vfs_table_offset as u64))?;
        let vfs_table = stream.read_bytes(header.vfs_table_size as usize)?;

        stream.seek(SeekFrom::Start(header.cft_table_offset as u64))?;
        let cft_table = stream.read_bytes(header.cft_table_size as usize)?;

        let mut parser = PathTableParser {
            header: &header,
            path_table_reader: Cursor::new(path_table),
            vfs_table_reader: Cursor::new(vfs_table),
            cft_table_reader: Cursor::new(cft_table),
            file_entries: HashMap::new(),
        };
        parser.parse(header.path_table_size as u64, "", 0)?;
        let file_entries = parser.file_entries;

        debug!("TVFS root lists {} files", file_entries.len());
        Ok(Self {
            header,
            file_entries,
        })
    }

    /// Marks every entry that references a key missing from `index` as non-existent.
    pub fn resolve_existence(&mut self, index: &IndexStore) {
        for entry in self.file_entries.values_mut() {
            entry.resolve(index);
        }
    }
}

/// Walks the path table. The VFS and CFT tables are only read on file nodes.
struct PathTableParser<'a> {
    header: &'a TVFSHeader,
    path_table_reader: Cursor<Vec<u8>>,
    vfs_table_reader: Cursor<Vec<u8>>,
    cft_table_reader: Cursor<Vec<u8>>,
    file_entries: HashMap<String, Entry>,
}

impl PathTableParser<'_> {
    fn parse_path_node(&mut self) -> Result<PathTableNode, CascError> {
        let mut entry = PathTableNode::default();

        let mut buf = self.path_table_reader.peek_byte()?;

        if buf == 0 {
            entry.flags |= PathTableNodeFlags::PATH_SEPARATOR_PRE;
            self.path_table_reader.skip(1)?;
            buf = self.path_table_reader.peek_byte()?;
        }

        if buf < 0x7F && buf != 0xFF {
            self.path_table_reader.skip(1)?;
            let name = self.path_table_reader.read_bytes(buf as usize)?;
            entry.name = String::from_utf8_lossy(&name).into_owned();
            buf = self.path_table_reader.peek_byte()?;
        }

        if buf == 0 {
            entry.flags |= PathTableNodeFlags::PATH_SEPARATOR_POST;
            self.path_table_reader.skip(1)?;
            buf = self.path_table_reader.peek_byte()?;
        }

        if buf == 0xFF {
            self.path_table_reader.skip(1)?;
            entry.value = Some(self.path_table_reader.read_u32::<BigEndian>()?);
            entry.flags |= PathTableNodeFlags::IS_NODE_VALUE;
        } else {
            entry.flags |= PathTableNodeFlags::PATH_SEPARATOR_POST;
        }

        Ok(entry)
    }

    fn add_entry(&mut self, name: &str, vfs_info_pos: u32) -> Result<(), CascError> {
        self.vfs_table_reader.set_position(vfs_info_pos as u64);

        let span_count = self.vfs_table_reader.read_u8()?;
        let cft_width = cft_offset_width(self.header.cft_table_size);
        let mut content_keys = Vec::with_capacity(span_count as usize);
        let mut content_size = 0u64;

        for _ in 0..span_count {
            let _ref_file_offset = self.vfs_table_reader.read_u32::<BigEndian>()?;
            let size_of_span = self.vfs_table_reader.read_u32::<BigEndian>()?;
            let cft_offset = self.vfs_table_reader.read_variable_be(cft_width)?;

            self.cft_table_reader.set_position(cft_offset as u64);
            let key = self
                .cft_table_reader
                .read_bytes(self.header.encoding_key_size as usize)?;
            content_keys.push(ContentKey::from_bytes(&key)?);
            content_size += size_of_span as u64;
        }

        self.file_entries
            .entry(name.to_string())
            .or_insert_with(|| Entry::new(name.to_string(), content_keys, content_size));
        Ok(())
    }

    /// Parses nodes up to `end`. Every path starts from `prefix`; names of nodes without a
    /// value accumulate until the next value node, after which the path resets to `prefix`.
    fn parse(&mut self, end: u64, prefix: &str, depth: usize) -> Result<(), CascError> {
        if depth > MAX_FOLDER_DEPTH {
            return Err(CascError::InvalidData("TVFS folders nested too deep".into()));
        }
        let mut builder = String::with_capacity(prefix.len() + 64);
        builder.push_str(prefix);

        while self.path_table_reader.position() < end {
            let node_start = self.path_table_reader.position();
            let entry = self.parse_path_node()?;
            if self.path_table_reader.position() == node_start {
                return Err(CascError::InvalidData(format!(
                    "Unreadable path table node at {node_start:#x}"
                )));
            }

            if entry.flags.contains(PathTableNodeFlags::PATH_SEPARATOR_PRE) {
                builder.push(PATH_SEPARATOR);
            }
            builder.push_str(&entry.name);
            if entry.flags.contains(PathTableNodeFlags::PATH_SEPARATOR_POST) {
                builder.push(PATH_SEPARATOR);
            }

            if let Some(value) = entry.value {
                if value & 0x8000_0000 != 0 {
                    // The folder size counts the 4 value bytes already read
                    let folder_size = (value & 0x7FFF_FFFF) as u64;
                    let folder_start = self.path_table_reader.position();
                    let folder_end = (folder_start + folder_size)
                        .checked_sub(4)
                        .filter(|&e| e >= folder_start && e <= end)
                        .ok_or_else(|| {
                            CascError::InvalidData(format!(
                                "Folder at {folder_start:#x} overruns its parent"
                            ))
                        })?;
                    self.parse(folder_end, &builder, depth + 1)?;
                } else {
                    self.add_entry(&builder, value)?;
                }
                builder.truncate(prefix.len());
            }
        }
        Ok(())
    }
}
