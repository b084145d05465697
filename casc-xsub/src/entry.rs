use crate::content_key::ContentKey;
use crate::index_store::IndexStore;

/// A logical file of the virtual file system.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The full path, with `\` separators.
    pub name: String,
    /// The keys whose spans are concatenated, in order, to form the file.
    pub content_keys: Vec<ContentKey>,
    /// The decoded size of the file, the sum of its span sizes.
    pub content_size: u64,
    /// Whether every key resolves in the index.
    pub exists: bool,
}

impl Entry {
    pub fn new(name: String, content_keys: Vec<ContentKey>, content_size: u64) -> Self {
        Self {
            name,
            content_keys,
            content_size,
            exists: true,
        }
    }

    /// Marks the entry as missing unless every one of its keys is in `index`.
    pub fn resolve(&mut self, index: &IndexStore) {
        self.exists = self.content_keys.iter().all(|key| index.contains(key));
    }
}
