/// Represents a frame within a CASC file, describing a segment of file data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascFileFrame {
    /// The virtual start offset of the frame within the file.
    pub virtual_start_offset: u64,
    /// The virtual end offset of the frame within the file.
    pub virtual_end_offset: u64,
    /// The offset of the frame within the archive.
    pub archive_offset: u64,
    /// The encoded (compressed/encrypted) size of the frame.
    pub encoded_size: u32,
    /// The decoded (original) content size of the frame.
    pub content_size: u32,
    /// Hash of the encoded frame from the block table.
    pub hash: [u8; 16],
}

impl CascFileFrame {
    pub fn contains(&self, position: u64) -> bool {
        position >= self.virtual_start_offset && position < self.virtual_end_offset
    }
}
