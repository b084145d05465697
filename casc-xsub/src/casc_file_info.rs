/// Represents information about a file in the CASC storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascFileInfo {
    /// The name of the file.
    pub file_name: String,
    /// The stored size of the file in bytes, zero when it is not local.
    pub file_size: u64,
    /// Whether every span of the file is present in the local archives.
    pub is_local: bool,
}
