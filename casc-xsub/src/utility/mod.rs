pub mod bit_packing;
pub(crate) mod dsv_file;
