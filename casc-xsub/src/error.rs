use std::io;
use thiserror::Error;

/// Represents all possible errors that can occur in the storage library.
///
/// Resolution failures surface as [`CascError::FileNotFound`], decode failures abort only the
/// file or block being read and never invalidate the loaded index or path table.
#[derive(Debug, Error)]
pub enum CascError {
    /// A path, key or archive is not present in the loaded storage.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// A file exists but its layout is not one this library understands.
    #[error("File is corrupted: {0}")]
    FileCorrupted(String),
    /// Data read from a file is inconsistent.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// A package or root file of an unsupported type.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// The installation could not be opened (missing build info, config or root).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A block table with no frame table.
    #[error("Empty content: {0}")]
    EmptyContent(String),
    /// A frame tagged with an encoding this library cannot decode.
    #[error("Unsupported block table encoding: {0:#04X}")]
    UnsupportedEncoding(u8),
    /// A frame or block failed to decompress to its declared size.
    #[error("Decompression failed: {0}")]
    Decompression(String),
    /// Represents an error that occurs during I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CascError>;

/// Lets `Read`/`Seek` implementations surface storage errors.
impl From<CascError> for io::Error {
    fn from(error: CascError) -> Self {
        match error {
            CascError::Io(err) => err,
            CascError::FileNotFound(_) => io::Error::new(io::ErrorKind::NotFound, error),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
