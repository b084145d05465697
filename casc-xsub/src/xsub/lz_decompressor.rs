use crate::error::CascError;

/// The external decompressor used for XSUB blocks of compression type 6 (Oodle).
///
/// Implementations decompress all of `input` into `output`, which is sized to the block's
/// declared decompressed size, and return the number of bytes produced. Any count other than
/// `output.len()` fails the extraction.
pub trait LzDecompressor: Send + Sync {
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CascError>;
}

impl<F> LzDecompressor for F
where
    F: Fn(&[u8], &mut [u8]) -> Result<usize, CascError> + Send + Sync,
{
    fn decompress(&self, input: &[u8], output: &mut [u8]) -> Result<usize, CascError> {
        self(input, output)
    }
}
