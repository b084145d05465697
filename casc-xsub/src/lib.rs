//! # casc-xsub
//!
//! `casc-xsub` is a pure Rust reader for Blizzard's CASC archives and the XSUB asset packages
//! stored in or alongside them. It opens a local installation offline, lists the files of its
//! TVFS root and extracts them by path or by key.
//!
//! ## Features
//! - Read and parse local CASC storages using a TVFS root
//! - List files and their metadata, search them with glob patterns
//! - Extract files by name or encoding key through seekable, lazily decoded streams
//! - Decompress XSUB package objects with a caller-supplied Oodle decompressor
//!
//! ### Example: Listing and Extracting Files
//! ```no_run
//! use casc_xsub::casc_storage::CascStorage;
//! use std::fs::File;
//!
//! // Open a CASC storage directory (containing .build.info and Data/)
//! let storage = CascStorage::open("path/to/casc/storage").unwrap();
//!
//! // List all files
//! for file_info in storage.files() {
//!     println!("File: {} ({} bytes)", file_info.file_name, file_info.file_size);
//! }
//!
//! // Extract a file by name
//! let mut casc_stream = storage.open_file("some/file/in/storage.txt").unwrap();
//! let mut output = File::create("output.txt").unwrap();
//! std::io::copy(&mut casc_stream, &mut output).unwrap();
//! ```
//!
//! ### Example: Extracting an XSUB Object
//! ```no_run
//! use casc_xsub::casc_storage::CascStorage;
//! use casc_xsub::error::CascError;
//! use casc_xsub::xsub::xsub_package_store::XSubPackageStore;
//! use std::sync::Arc;
//!
//! let oodle = |input: &[u8], output: &mut [u8]| -> Result<usize, CascError> {
//!     // Call into an Oodle binding here
//!     # let _ = input;
//!     Ok(output.len())
//! };
//!
//! let storage = Arc::new(CascStorage::open("path/to/casc/storage").unwrap());
//! let mut packages = XSubPackageStore::new(oodle);
//! packages.add_casc_packages(storage);
//! let asset = packages.extract(0x0123_4567_89AB_CDEF, 0).unwrap();
//! ```

mod block_table;
pub mod casc_build_info;
pub mod casc_config;
mod casc_data_files;
pub mod casc_file;
pub mod casc_file_frame;
pub mod casc_file_info;
pub mod casc_file_span;
pub mod casc_key_mapping_table;
mod casc_span_header;
pub mod casc_storage;
pub mod content_key;
pub mod entry;
pub mod error;
mod ext;
pub mod index_store;
mod path_table_node_flags;
pub mod tvfs_root_handler;
pub mod utility;
pub mod xsub;

pub use casc_file::CascFile;
pub use casc_file_info::CascFileInfo;
pub use casc_storage::CascStorage;
pub use content_key::{ContentKey, StableKeyId};
pub use error::CascError;
pub use index_store::IndexStore;
pub use xsub::lz_decompressor::LzDecompressor;
pub use xsub::xsub_package_store::XSubPackageStore;
