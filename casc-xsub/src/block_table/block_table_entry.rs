use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

/// Represents an entry in the block table.
/// Each entry describes one frame of the encoded data.
#[derive(Debug, Clone, Copy)]
pub struct BlockTableEntry {
    /// The encoded (compressed/encrypted) size of the frame, including its tag byte.
    pub encoded_size: u32,
    /// The decoded (original) content size of the frame.
    pub content_size: u32,
    /// MD5 of the encoded frame. Kept for verification, not checked on read.
    pub hash: [u8; 16],
}

impl BlockTableEntry {
    /// Size of one entry in the frame table.
    pub const SIZE: usize = 24;

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let encoded_size = reader.read_u32::<BigEndian>()?;
        let content_size = reader.read_u32::<BigEndian>()?;
        let mut hash = [0u8; 16];
        reader.read_exact(&mut hash)?;
        Ok(Self {
            encoded_size,
            content_size,
            hash,
        })
    }
}
