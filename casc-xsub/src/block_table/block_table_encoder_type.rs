/// Represents the encoding type used for frames in the block table.
///
/// The tag is the first byte of every encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTableEncoderType {
    /// Plain raw data, uncompressed and unencrypted.
    Raw,
    /// Zlib compressed data.
    ZLib,
    /// Encrypted data.
    Encrypted,
    /// Unknown or unsupported type, stores the raw byte value.
    Unknown(u8),
}

impl BlockTableEncoderType {
    /// The tag byte as stored in the archive.
    pub fn tag(self) -> u8 {
        match self {
            BlockTableEncoderType::Raw => 0x4E,
            BlockTableEncoderType::ZLib => 0x5A,
            BlockTableEncoderType::Encrypted => 0x45,
            BlockTableEncoderType::Unknown(other) => other,
        }
    }
}

impl From<u8> for BlockTableEncoderType {
    fn from(byte: u8) -> Self {
        match byte {
            0x4E => BlockTableEncoderType::Raw,
            0x5A => BlockTableEncoderType::ZLib,
            0x45 => BlockTableEncoderType::Encrypted,
            other => BlockTableEncoderType::Unknown(other),
        }
    }
}
