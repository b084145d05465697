use crate::{
    casc_build_info::CascBuildInfo,
    casc_config::CascConfig,
    casc_data_files::CascDataFiles,
    casc_file::CascFile,
    casc_file_info::CascFileInfo,
    casc_file_span::CascFileSpan,
    content_key::ContentKey,
    entry::Entry,
    error::CascError,
    index_store::IndexStore,
    tvfs_root_handler::{TVFSRootHandler, PATH_SEPARATOR},
};
use glob::{MatchOptions, Pattern};
use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

/// Size of the ASCII-decoded VFS root key.
const VFS_ROOT_KEY_SIZE: usize = 16;

/// Represents an open CASC storage directory, providing access to files and metadata.
///
/// `CascStorage` is the main entry point for interacting with Blizzard's CASC archives.
/// It loads the storage's build info, build configuration, index files and TVFS root once,
/// then serves reads through independent [`CascFile`] handles.
///
/// # Usage
///
/// ```no_run
/// use casc_xsub::casc_storage::CascStorage;
/// use std::io::Read;
///
/// // Open a CASC storage directory (containing .build.info and Data/)
/// let storage = CascStorage::open("path/to/casc/storage").unwrap();
///
/// // List all files
/// for file_info in storage.files() {
///     println!("File: {} ({} bytes)", file_info.file_name, file_info.file_size);
/// }
///
/// // Extract a file by name
/// let mut casc_reader = storage.open_file("some/file/in/storage.txt").unwrap();
/// let mut contents = Vec::new();
/// casc_reader.read_to_end(&mut contents).unwrap();
/// ```
///
/// # Thread Safety
///
/// `CascStorage` is immutable once opened and can be shared between threads behind an `Arc`.
/// Each `CascFile` it returns owns its own position and cache, and opens archives only for
/// the duration of a frame read.
///
/// # Note
/// This implementation only supports CASC storages that use the TVFS root file format.
#[derive(Debug)]
pub struct CascStorage {
    /// Path to the root of the storage directory.
    storage_path: PathBuf,
    /// Parsed build information from `.build.info`.
    build_info: CascBuildInfo,
    /// Parsed build configuration.
    config: CascConfig,
    /// The storage's `data.NNN` archives.
    data_files: Arc<CascDataFiles>,
    /// Locations of every encoding key.
    index: IndexStore,
    /// The logical file system.
    root_handler: TVFSRootHandler,
    /// List of files discovered in the storage, with metadata.
    files: Vec<CascFileInfo>,
}

impl CascStorage {
    /// Opens the installation rooted at `folder`.
    pub fn open<P: AsRef<Path>>(folder: P) -> Result<Self, CascError> {
        let storage_path = folder.as_ref().to_path_buf();
        let data_path = storage_path.join("Data");

        let build_info = Self::load_build_info(&storage_path)?;
        let config = Self::load_config(&build_info, &data_path)?;

        let archive_path = data_path.join("data");
        let data_files = Arc::new(CascDataFiles::discover(&archive_path)?);
        let index = IndexStore::load_directory(&archive_path);
        debug!(
            "Loaded {} index entries and {} archives",
            index.len(),
            data_files.len()
        );

        let mut root_handler = Self::load_root_handler(&config, &data_files, &index)?;
        root_handler.resolve_existence(&index);
        let files = Self::load_files(&root_handler);

        info!(
            "Opened CASC storage {} with {} files",
            storage_path.display(),
            files.len()
        );

        Ok(CascStorage {
            storage_path,
            build_info,
            config,
            data_files,
            index,
            root_handler,
            files,
        })
    }

    fn load_build_info(storage_path: &Path) -> Result<CascBuildInfo, CascError> {
        let path = storage_path.join(".build.info");
        if !path.is_file() {
            return Err(CascError::StorageUnavailable(format!(
                "Failed to locate Build Info at {}",
                path.display()
            )));
        }
        CascBuildInfo::from_file(&path).map_err(|e| match e {
            CascError::InvalidData(msg) => CascError::StorageUnavailable(msg),
            other => other,
        })
    }

    fn load_config(build_info: &CascBuildInfo, data_path: &Path) -> Result<CascConfig, CascError> {
        let build_key = build_info
            .build_key()
            .filter(|key| key.len() >= 4 && key.is_ascii())
            .ok_or_else(|| CascError::StorageUnavailable("Build Info has no build key".into()))?;

        let path = data_path
            .join("config")
            .join(&build_key[0..2])
            .join(&build_key[2..4])
            .join(build_key);
        if !path.is_file() {
            return Err(CascError::StorageUnavailable(format!(
                "Failed to locate Config Info at {}",
                path.display()
            )));
        }
        CascConfig::from_file(&path)
    }

    fn load_root_handler(
        config: &CascConfig,
        data_files: &Arc<CascDataFiles>,
        index: &IndexStore,
    ) -> Result<TVFSRootHandler, CascError> {
        // Only virtual file system roots are supported
        let key = config
            .vfs_root_key()
            .ok_or_else(|| CascError::StorageUnavailable("vfs-root not in config".into()))?;
        let key = ContentKey::from_ascii(key, VFS_ROOT_KEY_SIZE);

        if !index.contains(&key) {
            return Err(CascError::StorageUnavailable(format!(
                "VFS root {key} not in index"
            )));
        }

        let root = Self::open_spans(data_files, index, std::slice::from_ref(&key))?.read_all()?;
        TVFSRootHandler::new(&mut Cursor::new(root))
    }

    fn load_files(handler: &TVFSRootHandler) -> Vec<CascFileInfo> {
        let mut files: Vec<CascFileInfo> = handler
            .file_entries
            .values()
            .map(|entry| CascFileInfo {
                file_name: entry.name.clone(),
                file_size: if entry.exists { entry.content_size } else { 0 },
                is_local: entry.exists,
            })
            .collect();
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        files
    }

    /// Builds a reader over the concatenated spans of `keys`.
    fn open_spans(
        data_files: &Arc<CascDataFiles>,
        index: &IndexStore,
        keys: &[ContentKey],
    ) -> Result<CascFile, CascError> {
        let mut virtual_offset = 0u64;
        let mut spans = Vec::with_capacity(keys.len());

        for key in keys {
            let location = index
                .get(key)
                .ok_or_else(|| CascError::FileNotFound(format!("Key not in index: {key}")))?;
            let mut reader = data_files.open(location.archive_index)?;
            let span = CascFileSpan::read(
                &mut reader,
                location.archive_index,
                location.offset,
                virtual_offset,
            )?;
            virtual_offset = span.virtual_end_offset;
            spans.push(span);
        }
        Ok(CascFile::new(Arc::clone(data_files), spans))
    }

    /// Opens a file from the CASC storage by path, returning a new, independent handle.
    ///
    /// Paths may use `/` or `\` as separators. Files whose keys are missing from the local
    /// index are reported as [`CascError::FileNotFound`].
    pub fn open_file(&self, path: &str) -> Result<CascFile, CascError> {
        let entry = self
            .entry(path)
            .ok_or_else(|| CascError::FileNotFound(format!("Entry not found: {path}")))?;
        if !entry.exists {
            return Err(CascError::FileNotFound(format!(
                "Entry is not stored locally: {path}"
            )));
        }
        Self::open_spans(&self.data_files, &self.index, &entry.content_keys)
    }

    /// Opens the stored content of a single encoding key.
    pub fn open_key(&self, key: &ContentKey) -> Result<CascFile, CascError> {
        Self::open_spans(&self.data_files, &self.index, std::slice::from_ref(key))
    }

    /// Looks up the logical file at `path`.
    pub fn entry(&self, path: &str) -> Option<&Entry> {
        self.root_handler.file_entries.get(&normalize_path(path))
    }

    /// Every logical file, sorted by name.
    pub fn files(&self) -> &[CascFileInfo] {
        &self.files
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.file_name.as_str())
    }

    /// Files whose path matches a glob `pattern`, case-insensitively.
    ///
    /// The pattern may use `/` or `\` as separators; `*` does not cross folders.
    pub fn find_files(&self, pattern: &str) -> Result<Vec<&CascFileInfo>, CascError> {
        let pattern = Pattern::new(&pattern.replace(PATH_SEPARATOR, "/"))
            .map_err(|e| CascError::InvalidData(format!("Invalid pattern: {e}")))?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        Ok(self
            .files
            .iter()
            .filter(|f| pattern.matches_with(&f.file_name.replace(PATH_SEPARATOR, "/"), options))
            .collect())
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    pub fn root(&self) -> &TVFSRootHandler {
        &self.root_handler
    }

    pub fn build_info(&self) -> &CascBuildInfo {
        &self.build_info
    }

    pub fn config(&self) -> &CascConfig {
        &self.config
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('/', "\\")
}
