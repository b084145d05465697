use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// An entry of an XSUB package's hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XSubHashEntry {
    pub key: u64,
    pub packed_info: u64,
    pub packed_info_ex: u32,
}

impl XSubHashEntry {
    pub const SIZE: usize = 20;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            key: reader.read_u64::<LittleEndian>()?,
            packed_info: reader.read_u64::<LittleEndian>()?,
            packed_info_ex: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// Offset of the object's first block group, in 128 byte units in the high word.
    pub fn offset(&self) -> u64 {
        (self.packed_info >> 32) << 7
    }

    /// Size of the object's compressed region.
    pub fn compressed_size(&self) -> u64 {
        (self.packed_info >> 1) & 0x3FFF_FFFF
    }
}
