use crate::ext::io_ext::SeekExt;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek};

/// `KAPI` read as a little-endian integer.
pub const XSUB_MAGIC: u32 = 0x4950_414B;
/// Package type holding asset data.
pub const XSUB_ASSET_TYPE: u64 = 3;

/// The fixed header at the start of an XSUB package. All fields are little-endian.
#[derive(Debug, Clone)]
pub struct XSubHeader {
    pub magic: u32,
    pub unknown1: u16,
    pub version: u16,
    pub unknown2: u64,
    pub package_type: u64,
    pub size: u64,
    pub file_count: u64,
    pub data_offset: u64,
    pub data_size: u64,
    pub hash_count: u64,
    pub hash_offset: u64,
    pub hash_size: u64,
    pub unknown3: u64,
    pub unknown_offset: u64,
    pub unknown4: u64,
    pub index_count: u64,
    pub index_offset: u64,
    pub index_size: u64,
}

impl XSubHeader {
    /// Opaque hash block between the size and file count fields.
    const UNKNOWN_HASHES_SIZE: u32 = 1896;
    pub const SIZE: usize = 2024;

    pub fn read<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let magic = reader.read_u32::<LittleEndian>()?;
        let unknown1 = reader.read_u16::<LittleEndian>()?;
        let version = reader.read_u16::<LittleEndian>()?;
        let unknown2 = reader.read_u64::<LittleEndian>()?;
        let package_type = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u64::<LittleEndian>()?;
        reader.skip(Self::UNKNOWN_HASHES_SIZE)?;
        Ok(Self {
            magic,
            unknown1,
            version,
            unknown2,
            package_type,
            size,
            file_count: reader.read_u64::<LittleEndian>()?,
            data_offset: reader.read_u64::<LittleEndian>()?,
            data_size: reader.read_u64::<LittleEndian>()?,
            hash_count: reader.read_u64::<LittleEndian>()?,
            hash_offset: reader.read_u64::<LittleEndian>()?,
            hash_size: reader.read_u64::<LittleEndian>()?,
            unknown3: reader.read_u64::<LittleEndian>()?,
            unknown_offset: reader.read_u64::<LittleEndian>()?,
            unknown4: reader.read_u64::<LittleEndian>()?,
            index_count: reader.read_u64::<LittleEndian>()?,
            index_offset: reader.read_u64::<LittleEndian>()?,
            index_size: reader.read_u64::<LittleEndian>()?,
        })
    }
}
