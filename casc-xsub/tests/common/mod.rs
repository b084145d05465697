//! Builds synthetic CASC installations and XSUB packages on disk.
#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

pub const BUILD_KEY: &str = "0123456789abcdef0123456789abcdef";
pub const VFS_ROOT_KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
/// Frames are cut at this size, alternating raw and zlib encoding.
pub const FRAME_SIZE: usize = 64;

struct StoredFile {
    path: String,
    spans: Vec<Vec<u8>>,
    /// Spans whose keys are left out of the index.
    indexed: bool,
}

/// Describes the files of a synthetic installation.
#[derive(Default)]
pub struct InstallationBuilder {
    files: Vec<StoredFile>,
}

impl InstallationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file at `path` (`\` separated) made of one span per element of `spans`.
    pub fn file(mut self, path: &str, spans: &[&[u8]]) -> Self {
        self.files.push(StoredFile {
            path: path.to_string(),
            spans: spans.iter().map(|s| s.to_vec()).collect(),
            indexed: true,
        });
        self
    }

    /// Adds a file listed by the root but absent from the index.
    pub fn missing(mut self, path: &str, size: usize) -> Self {
        self.files.push(StoredFile {
            path: path.to_string(),
            spans: vec![vec![0; size]],
            indexed: false,
        });
        self
    }

    pub fn build(self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::write(
            root.join(".build.info"),
            format!(
                "Branch!STRING:0|Active!DEC:1|Build Key!HEX:16|CDN Key!HEX:16\n\
                 us|1|{BUILD_KEY}|ffffffffffffffffffffffffffffffff\n"
            ),
        )
        .unwrap();

        let config_dir = root
            .join("Data")
            .join("config")
            .join(&BUILD_KEY[0..2])
            .join(&BUILD_KEY[2..4]);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join(BUILD_KEY),
            format!("# Build Configuration\n\nroot = 00\nvfs-root = 1234 {VFS_ROOT_KEY}\n"),
        )
        .unwrap();

        let data_dir = root.join("Data").join("data");
        fs::create_dir_all(&data_dir).unwrap();

        let mut archive = Vec::new();
        let mut index = Vec::new();
        let mut tvfs_files = Vec::new();
        let mut next_key = 1u8;

        for file in &self.files {
            let mut spans = Vec::new();
            for content in &file.spans {
                let key = [next_key; 9];
                next_key += 1;
                if file.indexed {
                    let blte = blte(content);
                    index.push((key, archive.len() as u64, blte.len() as u32));
                    archive.extend_from_slice(&blte);
                }
                spans.push((key, content.len() as u32));
            }
            tvfs_files.push((file.path.clone(), spans));
        }

        let root_blte = blte(&tvfs_root(&tvfs_files));
        let mut root_key = [0u8; 9];
        hex_decode(&VFS_ROOT_KEY[..18], &mut root_key);
        index.push((root_key, archive.len() as u64, root_blte.len() as u32));
        archive.extend_from_slice(&root_blte);

        fs::write(data_dir.join("data.000"), &archive).unwrap();
        fs::write(data_dir.join("0000000001.idx"), index_file(&index)).unwrap();
        dir
    }
}

fn hex_decode(text: &str, out: &mut [u8]) {
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).unwrap();
    }
}

/// Encodes an index file holding `(key, offset, size)` entries of archive 0.
pub fn index_file(entries: &[([u8; 9], u64, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&7u16.to_le_bytes());
    out.extend_from_slice(&[0, 0, 4, 5, 9, 30]);
    out.extend_from_slice(&0x4000_0000u64.to_le_bytes());
    out.resize(32, 0);
    out.extend_from_slice(&((entries.len() * 18) as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for (key, offset, size) in entries {
        out.extend_from_slice(key);
        out.extend_from_slice(&offset.to_be_bytes()[3..]);
        out.extend_from_slice(&size.to_le_bytes());
    }
    out
}

/// Wraps `content` in a span header and block table.
pub fn blte(content: &[u8]) -> Vec<u8> {
    let frames: Vec<(Vec<u8>, usize)> = content
        .chunks(FRAME_SIZE)
        .enumerate()
        .map(|(i, chunk)| {
            let encoded = if i % 2 == 0 {
                [&[b'N'][..], chunk].concat()
            } else {
                let mut encoder = ZlibEncoder::new(vec![b'Z'], Compression::default());
                encoder.write_all(chunk).unwrap();
                encoder.finish().unwrap()
            };
            (encoded, chunk.len())
        })
        .collect();

    let table_size = 12 + 24 * frames.len();
    let total = 30 + table_size + frames.iter().map(|(f, _)| f.len()).sum::<usize>();

    let mut out = Vec::new();
    out.extend_from_slice(&[0xEE; 16]);
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&[0; 10]);
    out.extend_from_slice(b"BLTE");
    out.extend_from_slice(&(table_size as u32).to_be_bytes());
    out.push(0x0F);
    out.extend_from_slice(&(frames.len() as u32).to_be_bytes()[1..]);
    for (encoded, size) in &frames {
        out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
        out.extend_from_slice(&(*size as u32).to_be_bytes());
        out.extend_from_slice(&[0; 16]);
    }
    for (encoded, _) in &frames {
        out.extend_from_slice(encoded);
    }
    out
}

/// Encodes a TVFS root listing `files` as `(path, [(key, span size)])`.
fn tvfs_root(files: &[(String, Vec<([u8; 9], u32)>)]) -> Vec<u8> {
    let mut vfs = Vec::new();
    let mut cft = Vec::new();
    let mut leaves = Vec::new();
    let cft_size: usize = files.iter().map(|(_, spans)| spans.len() * 9).sum();
    let wide_offsets = cft_size > 0xFF;
    for (path, spans) in files {
        leaves.push((path.split('\\').collect::<Vec<_>>(), vfs.len() as u32));
        vfs.push(spans.len() as u8);
        for (key, size) in spans {
            vfs.extend_from_slice(&0u32.to_be_bytes());
            vfs.extend_from_slice(&size.to_be_bytes());
            if wide_offsets {
                vfs.extend_from_slice(&(cft.len() as u16).to_be_bytes());
            } else {
                vfs.push(cft.len() as u8);
            }
            cft.extend_from_slice(key);
        }
    }
    assert!(cft.len() <= 0xFFFF);

    let path_table = path_nodes(&leaves);
    let path_offset = 38u32;
    let vfs_offset = path_offset + path_table.len() as u32;
    let cft_offset = vfs_offset + vfs.len() as u32;

    let mut out = Vec::new();
    out.extend_from_slice(b"TVFS");
    out.extend_from_slice(&[1, 38, 9, 9]);
    out.extend_from_slice(&0u32.to_be_bytes());
    for field in [
        path_offset,
        path_table.len() as u32,
        vfs_offset,
        vfs.len() as u32,
        cft_offset,
        cft.len() as u32,
    ] {
        out.extend_from_slice(&field.to_be_bytes());
    }
    out.extend_from_slice(&8u16.to_be_bytes());
    out.extend_from_slice(&path_table);
    out.extend_from_slice(&vfs);
    out.extend_from_slice(&cft);
    out
}

/// Encodes path components as folder and file nodes, grouping siblings in order.
fn path_nodes(leaves: &[(Vec<&str>, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < leaves.len() {
        let (components, value) = &leaves[i];
        let name = components[0];
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());

        if components.len() == 1 {
            out.push(0xFF);
            out.extend_from_slice(&value.to_be_bytes());
            i += 1;
            continue;
        }

        let mut children = Vec::new();
        while i < leaves.len() && leaves[i].0.len() > 1 && leaves[i].0[0] == name {
            children.push((leaves[i].0[1..].to_vec(), leaves[i].1));
            i += 1;
        }
        let encoded = path_nodes(&children);
        out.push(0);
        out.push(0xFF);
        out.extend_from_slice(&(0x8000_0000 | (encoded.len() as u32 + 4)).to_be_bytes());
        out.extend_from_slice(&encoded);
    }
    out
}

/// A test object of an XSUB package: the key and the blocks of its single block group as
/// `(compressed bytes, decompressed size, decompressed offset)`.
pub struct PackageObject<'a> {
    pub key: u64,
    pub blocks: &'a [(&'a [u8], u32, u32)],
}

/// Builds an XSUB package. Every block is tagged as Oodle compressed.
pub fn xsub_package(objects: &[PackageObject]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x4950_414Bu32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&3u64.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    out.resize(2024, 0);
    out.resize(0x800, 0);

    let mut hashes = Vec::new();
    for object in objects {
        let start = out.len();
        let mut group = vec![0u8; 22];
        group[2..10].copy_from_slice(&object.key.to_le_bytes());
        group.push(object.blocks.len() as u8);
        let mut block_offset = 23 + 21 * object.blocks.len() as u32;
        for (data, size, offset) in object.blocks {
            group.push(6);
            group.extend_from_slice(&(data.len() as u32).to_le_bytes());
            group.extend_from_slice(&size.to_le_bytes());
            group.extend_from_slice(&block_offset.to_le_bytes());
            group.extend_from_slice(&offset.to_le_bytes());
            group.extend_from_slice(&0u32.to_le_bytes());
            block_offset += data.len() as u32;
        }
        for (data, _, _) in object.blocks {
            group.extend_from_slice(data);
        }
        out.extend_from_slice(&group);
        out.resize(out.len().next_multiple_of(0x80), 0);

        let packed = (((start as u64) >> 7) << 32) | ((group.len() as u64) << 1);
        hashes.push((object.key, packed));
    }

    let hash_offset = out.len() as u64;
    for (key, packed) in &hashes {
        out.extend_from_slice(&key.to_le_bytes());
        out.extend_from_slice(&packed.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
    }

    let fields = [
        objects.len() as u64,
        0x800,
        hash_offset - 0x800,
        hashes.len() as u64,
        hash_offset,
        20 * hashes.len() as u64,
    ];
    for (i, field) in fields.iter().enumerate() {
        let at = 1928 + i * 8;
        out[at..at + 8].copy_from_slice(&field.to_le_bytes());
    }
    out
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}
