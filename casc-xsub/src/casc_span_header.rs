//! The header stored in front of every block table inside a data archive.
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Represents the header for a span of data in a CASC archive.
///
/// The `CascSpanHeader` contains metadata fields used to identify and validate a span of file data.
#[allow(dead_code)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CascSpanHeader {
    /// The encoding key for the span, stored byte reversed.
    pub(crate) encoding_key: [u8; 16],
    /// The size of the span in bytes, including this header.
    pub(crate) content_size: u32,
    /// Flags associated with the span.
    pub(crate) flags: u16,
    /// Jenkins hash of the span data.
    pub(crate) jenkins_hash: u32,
    /// Checksum for data integrity verification.
    pub(crate) checksum: u32,
}

impl CascSpanHeader {
    /// Size of the header in bytes.
    pub(crate) const SIZE: usize = 30;

    pub(crate) fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut encoding_key = [0u8; 16];
        reader.read_exact(&mut encoding_key)?;
        Ok(Self {
            encoding_key,
            content_size: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u16::<LittleEndian>()?,
            jenkins_hash: reader.read_u32::<LittleEndian>()?,
            checksum: reader.read_u32::<LittleEndian>()?,
        })
    }
}
