use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, warn};

use crate::error::CascError;

/// The `data.NNN` archives of a storage, indexed by their numeric suffix.
///
/// Only paths are kept. Every read opens its own handle and drops it before returning, so a
/// `CascDataFiles` can be shared between readers on any thread.
#[derive(Debug, Default, Clone)]
pub struct CascDataFiles {
    paths: Vec<Option<PathBuf>>,
}

impl CascDataFiles {
    /// Finds every `data.NNN` file in `data_path`. Gaps in the numbering are allowed and only
    /// fail when a missing archive is read.
    pub fn discover<P: AsRef<Path>>(data_path: P) -> Result<Self, CascError> {
        let pattern = data_path.as_ref().join("data.*");
        let entries = glob(&pattern.to_string_lossy())
            .map_err(|e| CascError::InvalidData(format!("Invalid archive pattern: {e}")))?;

        let mut files = Self::default();
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Unreadable archive entry: {e}");
                    continue;
                }
            };
            let index = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(|e| e.parse::<usize>().ok());
            if let Some(index) = index {
                files.insert(index, path);
            }
        }
        debug!("Found {} data archives", files.len());
        Ok(files)
    }

    /// Registers the archive with the given number.
    pub fn insert(&mut self, index: usize, path: PathBuf) {
        if self.paths.len() <= index {
            self.paths.resize(index + 1, None);
        }
        self.paths[index] = Some(path);
    }

    /// The number of archives present.
    pub fn len(&self) -> usize {
        self.paths.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self, archive_index: u32) -> Option<&Path> {
        self.paths.get(archive_index as usize)?.as_deref()
    }

    /// Opens an archive for reading.
    pub fn open(&self, archive_index: u32) -> Result<BufReader<File>, CascError> {
        let path = self.path(archive_index).ok_or_else(|| {
            CascError::FileNotFound(format!("Missing archive data.{archive_index:03}"))
        })?;
        Ok(BufReader::new(File::open(path)?))
    }

    /// Reads `size` bytes at `offset` of an archive.
    pub fn read(&self, archive_index: u32, offset: u64, size: usize) -> Result<Vec<u8>, CascError> {
        let mut file = self.open(archive_index)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; size];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}
