//! Small pure helpers for the packed integer fields found in index entries, block tables and
//! TVFS tables. Archive headers store several integers as raw byte runs of odd widths, so
//! these are decoded explicitly rather than through native integer reads.

/// Decodes a big-endian unsigned integer from up to 8 raw bytes.
pub fn read_be_uint(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

/// Decodes a little-endian unsigned integer from up to 8 raw bytes.
pub fn read_le_uint(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
}

/// Splits a packed `(archive index, offset)` value.
///
/// The low `file_offset_bits` bits hold the offset within the archive, the remaining high
/// bits hold the archive index.
pub fn split_packed_offset(packed: u64, file_offset_bits: u8) -> (u32, u64) {
    if file_offset_bits >= 64 {
        return (0, packed);
    }
    let mask = (1u64 << file_offset_bits) - 1;
    ((packed >> file_offset_bits) as u32, packed & mask)
}

/// Returns the byte width of a CFT table offset for a CFT table of the given size.
pub fn cft_offset_width(cft_table_size: u32) -> usize {
    if cft_table_size > 0xFF_FFFF {
        4
    } else if cft_table_size > 0xFFFF {
        3
    } else if cft_table_size > 0xFF {
        2
    } else {
        1
    }
}

/// Rounds `value` up to the next multiple of `alignment`, which must be a power of two.
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
