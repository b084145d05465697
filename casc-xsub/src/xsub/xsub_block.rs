use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Compression of a block within an XSUB block group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XSubCompressionType {
    /// Oodle compressed, handled by the external decompressor.
    Oodle,
    /// Unknown or unsupported type, stores the raw byte value.
    Unknown(u8),
}

impl From<u8> for XSubCompressionType {
    fn from(byte: u8) -> Self {
        match byte {
            6 => XSubCompressionType::Oodle,
            other => XSubCompressionType::Unknown(other),
        }
    }
}

/// A block descriptor of an XSUB block group.
#[derive(Debug, Clone, Copy)]
pub struct XSubBlock {
    pub compression_type: u8,
    pub compressed_size: u32,
    pub decompressed_size: u32,
    /// Offset of the compressed bytes from the start of the block group.
    pub block_offset: u32,
    /// Offset of the decompressed bytes in the output buffer.
    pub decompressed_offset: u32,
    pub reserved: u32,
}

impl XSubBlock {
    pub const SIZE: usize = 21;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            compression_type: reader.read_u8()?,
            compressed_size: reader.read_u32::<LittleEndian>()?,
            decompressed_size: reader.read_u32::<LittleEndian>()?,
            block_offset: reader.read_u32::<LittleEndian>()?,
            decompressed_offset: reader.read_u32::<LittleEndian>()?,
            reserved: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn compression(&self) -> XSubCompressionType {
        XSubCompressionType::from(self.compression_type)
    }
}
