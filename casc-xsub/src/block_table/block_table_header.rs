use crate::ext::io_ext::ReadExt;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read, Seek};

/// `BLTE` as it appears in the archive.
pub(crate) const BLOCK_TABLE_SIGNATURE: [u8; 4] = *b"BLTE";

/// Block Table Header
/// Follows the span header and precedes the frame table.
#[derive(Debug, Clone, Copy)]
pub struct BlockTableHeader {
    /// The signature identifying the block table.
    pub signature: [u8; 4],
    /// The size of the header and frame table in bytes. Zero means there is no frame table.
    pub header_size: u32,
    /// The format version of the table.
    pub table_format: u8,
    /// The number of frames in the table, stored as a 24 bit big-endian integer.
    pub frame_count: u32,
}

impl BlockTableHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 12;

    pub fn read<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature)?;
        Ok(Self {
            signature,
            header_size: reader.read_u32::<BigEndian>()?,
            table_format: reader.read_u8()?,
            frame_count: reader.read_u24_be()?,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.signature == BLOCK_TABLE_SIGNATURE
    }
}
