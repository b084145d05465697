//! Module for handling CASC key mapping tables (`.idx` files), which map encoding keys to
//! archive locations.
use crate::content_key::ContentKey;
use crate::error::CascError;
use crate::utility::bit_packing::{align_up, read_be_uint, read_le_uint, split_packed_offset};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Size of the index header described by the first block.
pub(crate) const INDEX_HEADER_SIZE: u32 = 16;
/// The only field layout this library reads: 4 byte sizes, 5 byte offsets, 9 byte keys.
pub(crate) const SUPPORTED_ENCODED_SIZE_LENGTH: u8 = 4;
pub(crate) const SUPPORTED_STORAGE_OFFSET_LENGTH: u8 = 5;
pub(crate) const SUPPORTED_ENCODING_KEY_LENGTH: u8 = 9;

/// Represents the header of a CASC key mapping table.
///
/// The field lengths describe the layout of every entry in the table.
#[derive(Debug, Clone, Copy)]
pub struct CascKeyMappingTable {
    /// The version of the key mapping table format.
    pub version: u16,
    /// The bucket index used for hashing.
    pub bucket_index: u8,
    /// Extra bytes per entry, must be zero.
    pub extra_bytes: u8,
    /// The length in bytes of the encoded size field.
    pub encoded_size_length: u8,
    /// The length in bytes of the storage offset field.
    pub storage_offset_length: u8,
    /// The length in bytes of the encoding key.
    pub encoding_key_length: u8,
    /// The number of bits of the storage offset used for the file offset.
    pub file_offset_bits: u8,
    /// The maximum archive segment size.
    pub segment_size: u64,
}

/// Represents a single entry in a CASC key mapping table.
///
/// Each entry maps an encoding key to an archive index, offset and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// The encoding key for the file data.
    pub encoding_key: ContentKey,
    /// The index of the archive (`data.NNN`) containing the file data.
    pub archive_index: u32,
    /// The offset of the file data within the archive.
    pub offset: u64,
    /// The size of the file data.
    pub size: u32,
}

impl CascKeyMappingTable {
    /// Parses an index file, returning its header and entries in file order.
    ///
    /// Returns [`CascError::FileCorrupted`] when the header block has the wrong size or the
    /// field lengths are not the supported profile. A truncated entry table is an I/O error,
    /// in which case none of the file's entries should be used.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<(Self, Vec<IndexEntry>), CascError> {
        let header_size = reader.read_u32::<LittleEndian>()?;
        let _header_hash = reader.read_u32::<LittleEndian>()?;

        if header_size != INDEX_HEADER_SIZE {
            return Err(CascError::FileCorrupted(format!(
                "Unexpected index header size {header_size}"
            )));
        }

        let table = CascKeyMappingTable {
            version: reader.read_u16::<LittleEndian>()?,
            bucket_index: reader.read_u8()?,
            extra_bytes: reader.read_u8()?,
            encoded_size_length: reader.read_u8()?,
            storage_offset_length: reader.read_u8()?,
            encoding_key_length: reader.read_u8()?,
            file_offset_bits: reader.read_u8()?,
            segment_size: reader.read_u64::<LittleEndian>()?,
        };

        if !table.is_supported() {
            return Err(CascError::FileCorrupted(format!(
                "Unsupported key mapping table layout: key {} offset {} size {} extra {}",
                table.encoding_key_length,
                table.storage_offset_length,
                table.encoded_size_length,
                table.extra_bytes
            )));
        }

        let pos = reader.stream_position()?;
        reader.seek(SeekFrom::Start(align_up(pos, 0x10)))?;

        let table_size = reader.read_u32::<LittleEndian>()?;
        let _table_hash = reader.read_u32::<LittleEndian>()?;

        let table_start = reader.stream_position()?;
        let stream_end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(table_start))?;
        let available = stream_end.saturating_sub(table_start);
        if table_size as u64 > available {
            return Err(CascError::FileCorrupted(format!(
                "Entry table of {table_size} bytes exceeds the {available} bytes left"
            )));
        }

        let entry_size = table.entry_size();
        let mut entries = Vec::with_capacity(table_size as usize / entry_size);
        let mut entry_buffer = vec![0u8; entry_size];
        let mut consumed = 0usize;
        while consumed < table_size as usize {
            reader.read_exact(&mut entry_buffer)?;
            entries.push(table.parse_entry(&entry_buffer)?);
            consumed += entry_size;
        }

        Ok((table, entries))
    }

    fn is_supported(&self) -> bool {
        self.extra_bytes == 0
            && self.encoded_size_length == SUPPORTED_ENCODED_SIZE_LENGTH
            && self.storage_offset_length == SUPPORTED_STORAGE_OFFSET_LENGTH
            && self.encoding_key_length == SUPPORTED_ENCODING_KEY_LENGTH
    }

    fn entry_size(&self) -> usize {
        (self.encoded_size_length + self.storage_offset_length + self.encoding_key_length) as usize
    }

    /// Unpacks one `key | packed offset (BE) | size (LE)` entry.
    fn parse_entry(&self, buffer: &[u8]) -> Result<IndexEntry, CascError> {
        let key_end = self.encoding_key_length as usize;
        let offset_end = key_end + self.storage_offset_length as usize;
        let size_end = offset_end + self.encoded_size_length as usize;

        let encoding_key = ContentKey::from_bytes(&buffer[..key_end])?;
        let packed = read_be_uint(&buffer[key_end..offset_end]);
        let size = read_le_uint(&buffer[offset_end..size_end]) as u32;
        let (archive_index, offset) = split_packed_offset(packed, self.file_offset_bits);

        Ok(IndexEntry {
            encoding_key,
            archive_index,
            offset,
            size,
        })
    }
}
