use std::fmt;

use xxhash_rust::xxh64::xxh64;

use crate::error::CascError;

/// Maps `((c & 0x1F) ^ 0x10)` of an ASCII hex digit to its nibble value.
const NIBBLE_TABLE: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, //
    0x08, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
];

/// A 64 bit identifier derived from a [`ContentKey`] with xxHash64.
///
/// Used as the key of every lookup table so raw byte sequences never have to be hashed or
/// compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableKeyId(pub u64);

impl fmt::Display for StableKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A fixed-length byte identifier for a stored blob, independent of its location.
///
/// Keys are up to 16 bytes long; index files only keep the first 9 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey {
    bytes: [u8; ContentKey::MAX_LEN],
    len: u8,
}

impl ContentKey {
    /// The longest key the storage uses.
    pub const MAX_LEN: usize = 16;

    /// Creates a key from raw bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CascError> {
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return Err(CascError::InvalidData(format!(
                "Content key length {} out of range",
                raw.len()
            )));
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// Decodes a key written as ASCII hex in config files.
    ///
    /// Each pair of characters becomes one byte through the nibble substitution table, so
    /// upper and lower case digits decode the same. Decoding stops after `key_size` bytes or
    /// at the end of `text`; bytes not covered by `text` stay zero.
    pub fn from_ascii(text: &str, key_size: usize) -> Self {
        let key_size = key_size.clamp(1, Self::MAX_LEN);
        let chars = text.as_bytes();
        let mut bytes = [0u8; Self::MAX_LEN];

        for (i, pair) in chars.chunks_exact(2).take(key_size).enumerate() {
            let high = NIBBLE_TABLE[((pair[0] & 0x1F) ^ 0x10) as usize];
            let low = NIBBLE_TABLE[((pair[1] & 0x1F) ^ 0x10) as usize];
            bytes[i] = (high << 4) | low;
        }

        Self {
            bytes,
            len: key_size as u8,
        }
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns this key cut down to at most `len` bytes.
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.clamp(1, self.len as usize);
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..len].copy_from_slice(&self.bytes[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }

    /// Derives the [`StableKeyId`] of this key.
    pub fn stable_id(&self) -> StableKeyId {
        StableKeyId(xxh64(self.as_bytes(), 0))
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({self})")
    }
}
