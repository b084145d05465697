use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, trace, warn};

use crate::casc_key_mapping_table::{CascKeyMappingTable, IndexEntry, SUPPORTED_ENCODING_KEY_LENGTH};
use crate::content_key::{ContentKey, StableKeyId};
use crate::error::CascError;

/// Maps every encoding key of a storage to its archive location.
///
/// Built once from the storage's `.idx` files and read-only afterwards. When the same key
/// appears in several index files, the entry from the file parsed last wins.
#[derive(Debug, Default)]
pub struct IndexStore {
    entries: HashMap<StableKeyId, IndexEntry>,
}

impl IndexStore {
    /// Loads every `*.idx` file in `data_path`, in sorted file name order.
    ///
    /// A missing directory yields an empty store.
    pub fn load_directory<P: AsRef<Path>>(data_path: P) -> Self {
        let data_path = data_path.as_ref();
        if !data_path.is_dir() {
            warn!("Index directory {} does not exist", data_path.display());
            return Self::default();
        }

        let pattern = data_path.join("*.idx");
        let mut paths: Vec<PathBuf> = match glob(&pattern.to_string_lossy()) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
            Err(e) => {
                warn!("Invalid index pattern {}: {e}", pattern.display());
                Vec::new()
            }
        };
        paths.sort();
        Self::load(paths)
    }

    /// Loads the given index files in order.
    ///
    /// Files that cannot be read or use an unsupported layout are skipped with a warning.
    pub fn load<I, P>(index_file_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut store = Self::default();
        for path in index_file_paths {
            let path = path.as_ref();
            match Self::parse_file(path) {
                Ok(entries) => {
                    debug!("Loaded {} index entries from {}", entries.len(), path.display());
                    store.extend(entries);
                }
                Err(e) => warn!("Skipping index file {}: {e}", path.display()),
            }
        }
        debug!("Index store holds {} keys", store.entries.len());
        store
    }

    fn parse_file(path: &Path) -> Result<Vec<IndexEntry>, CascError> {
        let mut reader = BufReader::new(File::open(path)?);
        let (table, entries) = CascKeyMappingTable::parse(&mut reader)?;
        trace!(
            "Index {}: version={}, bucket={:02x}, offset_bits={}",
            path.display(),
            table.version,
            table.bucket_index,
            table.file_offset_bits
        );
        Ok(entries)
    }

    /// Inserts entries, replacing any existing entry with the same key.
    pub fn extend<I: IntoIterator<Item = IndexEntry>>(&mut self, entries: I) {
        for entry in entries {
            self.entries.insert(entry.encoding_key.stable_id(), entry);
        }
    }

    /// Looks up a key. Longer keys are truncated to the index key length first.
    pub fn get(&self, key: &ContentKey) -> Option<&IndexEntry> {
        self.entries.get(&Self::lookup_id(key))
    }

    pub fn get_by_id(&self, id: StableKeyId) -> Option<&IndexEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, key: &ContentKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StableKeyId, &IndexEntry)> {
        self.entries.iter()
    }

    fn lookup_id(key: &ContentKey) -> StableKeyId {
        key.truncated(SUPPORTED_ENCODING_KEY_LENGTH as usize).stable_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casc_key_mapping_table::tests::build_index;
    use std::fs;

    #[test]
    fn last_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let key = [9u8, 8, 7, 6, 5, 4, 3, 2, 1];
        let other = [1u8; 9];
        fs::write(dir.path().join("0000000001.idx"), build_index(&[(key, 0, 100, 50), (other, 1, 8, 8)])).unwrap();
        fs::write(dir.path().join("0000000002.idx"), build_index(&[(key, 2, 4096, 60)])).unwrap();

        let store = IndexStore::load_directory(dir.path());
        assert_eq!(store.len(), 2);
        let entry = store.get(&ContentKey::from_bytes(&key).unwrap()).unwrap();
        assert_eq!((entry.archive_index, entry.offset, entry.size), (2, 4096, 60));
    }

    #[test]
    fn corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("01.idx");
        let bad = dir.path().join("02.idx");
        fs::write(&good, build_index(&[([3u8; 9], 0, 10, 20)])).unwrap();
        let mut corrupt = build_index(&[([4u8; 9], 0, 10, 20)]);
        corrupt[13] = 6;
        fs::write(&bad, corrupt).unwrap();

        let store = IndexStore::load([&good, &bad, &dir.path().join("missing.idx")]);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&ContentKey::from_bytes(&[3u8; 9]).unwrap()));
    }

    #[test]
    fn oversized_entry_table_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("01.idx");
        let bad = dir.path().join("02.idx");
        fs::write(&good, build_index(&[([3u8; 9], 0, 10, 20)])).unwrap();
        let mut oversized = build_index(&[([4u8; 9], 0, 10, 20)]);
        oversized[32..36].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        fs::write(&bad, oversized).unwrap();

        let store = IndexStore::load([&good, &bad]);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&ContentKey::from_bytes(&[3u8; 9]).unwrap()));
    }

    #[test]
    fn long_keys_resolve_against_short_index_keys() {
        let mut store = IndexStore::default();
        let full = ContentKey::from_bytes(&[0x5Au8; 16]).unwrap();
        store.extend([IndexEntry {
            encoding_key: full.truncated(9),
            archive_index: 0,
            offset: 0,
            size: 1,
        }]);
        assert!(store.contains(&full));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::load_directory(dir.path().join("nope"));
        assert!(store.is_empty());
    }
}
