//! XSUB asset packages: a hash table of keys to block groups of Oodle compressed blocks.
pub mod lz_decompressor;
pub mod xsub_block;
pub mod xsub_hash_entry;
pub mod xsub_header;
pub mod xsub_package_store;
