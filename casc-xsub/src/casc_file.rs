use crate::block_table::block_table_encoder_type::BlockTableEncoderType;
use crate::casc_data_files::CascDataFiles;
use crate::casc_file_frame::CascFileFrame;
use crate::casc_file_span::CascFileSpan;
use crate::error::CascError;
use flate2::read::ZlibDecoder;
use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};
use tracing::trace;

/// A seekable stream over the decoded contents of one logical file.
///
/// This struct manages reading, seeking, and caching data from multiple file spans, decoding
/// one frame at a time. The most recently decoded frame is cached, so sequential and repeated
/// reads within a frame never decode it twice. Each instance owns its cursor and cache; use one
/// per thread.
pub struct CascFile {
    /// The archives the spans point into.
    data_files: Arc<CascDataFiles>,
    /// The spans that make up the file.
    spans: Vec<CascFileSpan>,
    /// The total size of the file.
    internal_size: u64,
    /// The current read position within the file.
    internal_position: u64,
    /// The decoded bytes of the cached frame.
    cache: Vec<u8>,
    /// The start position of the cache.
    cache_start_position: u64,
    /// The end position of the cache.
    cache_end_position: u64,
    /// Span and frame index of the last decoded frame.
    last_frame: Option<(usize, usize)>,
    /// Number of frames decoded so far.
    decoded_frames: u64,
}

impl CascFile {
    /// Creates a new `CascFile` from the given spans.
    pub(crate) fn new(data_files: Arc<CascDataFiles>, spans: Vec<CascFileSpan>) -> Self {
        let internal_size = spans.last().map_or(0, |s| s.virtual_end_offset);
        CascFile {
            data_files,
            spans,
            internal_size,
            internal_position: 0,
            cache: Vec::new(),
            cache_start_position: 0,
            cache_end_position: 0,
            last_frame: None,
            decoded_frames: 0,
        }
    }

    /// Returns the total size of the file.
    pub fn size(&self) -> u64 {
        self.internal_size
    }

    /// Returns the current read position.
    pub fn position(&self) -> u64 {
        self.internal_position
    }

    pub fn spans(&self) -> &[CascFileSpan] {
        &self.spans
    }

    /// Reads up to `count` bytes from the current position.
    ///
    /// Returns `None` when the position is at or past the end of the file and a shorter buffer
    /// when the file ends before `count` bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Option<Vec<u8>>, CascError> {
        if self.internal_position >= self.internal_size {
            return Ok(None);
        }
        let available = (self.internal_size - self.internal_position).min(count as u64) as usize;
        let mut buffer = vec![0u8; available];
        let read = self.read_into(&mut buffer)?;
        buffer.truncate(read);
        Ok(Some(buffer))
    }

    /// Decodes the whole file from the start.
    pub fn read_all(&mut self) -> Result<Vec<u8>, CascError> {
        self.internal_position = 0;
        Ok(self
            .read_bytes(self.internal_size as usize)?
            .unwrap_or_default())
    }

    /// Copies cached bytes into `buf`, decoding frames as needed.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, CascError> {
        let mut consumed = 0;

        while consumed < buf.len() {
            let position = self.internal_position;
            if position >= self.internal_size {
                break;
            }

            if !(self.cache_start_position <= position && position < self.cache_end_position) {
                self.load_frame(position)?;
            }

            let p = (position - self.cache_start_position) as usize;
            let n = (buf.len() - consumed).min(self.cache.len() - p);
            buf[consumed..consumed + n].copy_from_slice(&self.cache[p..p + n]);
            consumed += n;
            self.internal_position += n as u64;
        }
        Ok(consumed)
    }

    /// Decodes the frame covering `position` into the cache.
    fn load_frame(&mut self, position: u64) -> Result<(), CascError> {
        let (span_index, frame_index) = self.locate(position)?;
        let span = &self.spans[span_index];
        let frame = span.frames[frame_index];

        let encoded = self.data_files.read(
            span.archive_index,
            frame.archive_offset,
            frame.encoded_size as usize,
        )?;
        let decoded = Self::decode_frame(&frame, &encoded)?;

        trace!(
            "Decoded frame {} of span {} ({} -> {} bytes)",
            frame_index,
            span_index,
            frame.encoded_size,
            frame.content_size
        );

        self.cache = decoded;
        self.cache_start_position = frame.virtual_start_offset;
        self.cache_end_position = frame.virtual_end_offset;
        self.last_frame = Some((span_index, frame_index));
        self.decoded_frames += 1;
        Ok(())
    }

    fn locate(&self, position: u64) -> Result<(usize, usize), CascError> {
        let (hint_span, hint_frame) = match self.last_frame {
            Some((span, frame)) => (Some(span), Some(frame)),
            None => (None, None),
        };
        let span_index = hint_span
            .filter(|&s| self.spans[s].contains(position))
            .or_else(|| self.spans.iter().position(|s| s.contains(position)))
            .ok_or_else(|| CascError::InvalidData(format!("No span covers offset {position}")))?;
        let hint_frame = if hint_span == Some(span_index) {
            hint_frame
        } else {
            None
        };
        let frame_index = self.spans[span_index]
            .find_frame(position, hint_frame)
            .ok_or_else(|| CascError::InvalidData(format!("No frame covers offset {position}")))?;
        Ok((span_index, frame_index))
    }

    /// Decodes one encoded frame according to its leading tag byte.
    fn decode_frame(frame: &CascFileFrame, encoded: &[u8]) -> Result<Vec<u8>, CascError> {
        let (&tag, payload) = encoded
            .split_first()
            .ok_or_else(|| CascError::InvalidData("Empty frame".into()))?;
        let content_size = frame.content_size as usize;

        let decoded = match BlockTableEncoderType::from(tag) {
            BlockTableEncoderType::Raw => {
                if payload.len() < content_size {
                    return Err(CascError::InvalidData(format!(
                        "Raw frame holds {} bytes, expected {content_size}",
                        payload.len()
                    )));
                }
                payload[..content_size].to_vec()
            }
            BlockTableEncoderType::ZLib => {
                // One byte past the declared size is enough to detect an overrun
                let mut decoder = ZlibDecoder::new(payload).take(content_size as u64 + 1);
                let mut cache = Vec::with_capacity(content_size);
                decoder
                    .read_to_end(&mut cache)
                    .map_err(|e| CascError::Decompression(format!("zlib frame: {e}")))?;
                cache
            }
            other => return Err(CascError::UnsupportedEncoding(other.tag())),
        };

        if decoded.len() != content_size {
            return Err(CascError::Decompression(format!(
                "Frame decoded to {} bytes, expected {content_size}",
                decoded.len()
            )));
        }
        Ok(decoded)
    }
}

impl Read for CascFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl Seek for CascFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(offset) => self.internal_position.checked_add_signed(offset),
            SeekFrom::End(offset) => self.internal_size.checked_add_signed(offset),
        };
        self.internal_position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "Seek to a negative position")
        })?;
        Ok(self.internal_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casc_file_span::tests::{build_blte, Encoding};
    use crate::ext::io_ext::ReadExt;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        data_files: Arc<CascDataFiles>,
    }

    fn fixture(archive: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.000");
        fs::write(&path, archive).unwrap();
        let mut data_files = CascDataFiles::default();
        data_files.insert(0, path);
        Fixture {
            _dir: dir,
            data_files: Arc::new(data_files),
        }
    }

    fn content(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    fn three_frame_file() -> (Fixture, CascFile, Vec<u8>) {
        let a = content(13, 1);
        let b = content(40, 2);
        let c = content(9, 3);
        let blte = build_blte(&[(Encoding::Raw, &a[..]), (Encoding::ZLib, &b[..]), (Encoding::Raw, &c[..])]);
        let fixture = fixture(&blte);
        let span = CascFileSpan::read(&mut fixture.data_files.open(0).unwrap(), 0, 0, 0).unwrap();
        let file = CascFile::new(fixture.data_files.clone(), vec![span]);
        (fixture, file, [a, b, c].concat())
    }

    #[test]
    fn every_range_matches_eager_decode() {
        let (_fixture, mut file, expected) = three_frame_file();
        assert_eq!(file.size(), expected.len() as u64);
        for start in 0..expected.len() {
            for len in 1..=(expected.len() - start) {
                file.seek(SeekFrom::Start(start as u64)).unwrap();
                let bytes = file.read_bytes(len).unwrap().unwrap();
                assert_eq!(bytes, &expected[start..start + len], "start {start} len {len}");
            }
        }
    }

    #[test]
    fn cached_frame_is_not_decoded_twice() {
        let (_fixture, mut file, _) = three_frame_file();
        file.read_bytes(4).unwrap();
        file.seek(SeekFrom::Start(2)).unwrap();
        file.read_bytes(8).unwrap();
        assert_eq!(file.decoded_frames, 1);

        // exactly at the boundary of the second frame
        file.seek(SeekFrom::Start(13)).unwrap();
        file.read_bytes(1).unwrap();
        assert_eq!(file.decoded_frames, 2);
        file.read_bytes(39).unwrap();
        assert_eq!(file.decoded_frames, 2);
    }

    #[test]
    fn reads_at_or_past_end() {
        let (_fixture, mut file, expected) = three_frame_file();
        file.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(file.read_bytes(1).unwrap(), None);
        file.seek(SeekFrom::Start(1000)).unwrap();
        assert_eq!(file.read_bytes(1).unwrap(), None);
        file.seek(SeekFrom::End(-3)).unwrap();
        assert_eq!(file.read_bytes(10).unwrap().unwrap(), &expected[expected.len() - 3..]);
        assert!(file.seek(SeekFrom::Current(-1000)).is_err());
    }

    #[test]
    fn peek_does_not_consume() {
        let (_fixture, mut file, expected) = three_frame_file();
        file.seek(SeekFrom::Start(20)).unwrap();
        assert_eq!(file.peek_byte().unwrap(), expected[20]);
        assert_eq!(file.position(), 20);
        let mut all = Vec::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_end(&mut all).unwrap();
        assert_eq!(all, expected);
    }

    #[test]
    fn spans_are_concatenated() {
        let a = content(5, 9);
        let b = content(7, 4);
        let first = build_blte(&[(Encoding::Raw, &a[..])]);
        let second = build_blte(&[(Encoding::ZLib, &b[..])]);
        let fixture = fixture(&[first.clone(), second].concat());
        let mut archive = fixture.data_files.open(0).unwrap();
        let span_a = CascFileSpan::read(&mut archive, 0, 0, 0).unwrap();
        let span_b = CascFileSpan::read(&mut archive, 0, first.len() as u64, span_a.virtual_end_offset).unwrap();
        let mut file = CascFile::new(fixture.data_files.clone(), vec![span_a, span_b]);

        assert_eq!(file.size(), 12);
        file.seek(SeekFrom::Start(3)).unwrap();
        assert_eq!(file.read_bytes(5).unwrap().unwrap(), [&a[3..], &b[..3]].concat());
    }

    #[test]
    fn zlib_frame_larger_than_declared_fails() {
        let mut blte = build_blte(&[(Encoding::ZLib, &[7u8; 300][..])]);
        // content size of the only frame
        blte[46..50].copy_from_slice(&10u32.to_be_bytes());
        let fixture = fixture(&blte);
        let span = CascFileSpan::read(&mut fixture.data_files.open(0).unwrap(), 0, 0, 0).unwrap();
        let mut file = CascFile::new(fixture.data_files.clone(), vec![span]);
        assert_eq!(file.size(), 10);
        assert!(matches!(file.read_bytes(4), Err(CascError::Decompression(_))));
    }

    #[test]
    fn unknown_tag_fails_the_read() {
        let blte = build_blte(&[(Encoding::Tag(0x45), &b"secret"[..])]);
        let fixture = fixture(&blte);
        let span = CascFileSpan::read(&mut fixture.data_files.open(0).unwrap(), 0, 0, 0).unwrap();
        let mut file = CascFile::new(fixture.data_files.clone(), vec![span]);
        assert!(matches!(
            file.read_bytes(2),
            Err(CascError::UnsupportedEncoding(0x45))
        ));
        let mut buf = [0u8; 2];
        assert_eq!(
            file.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }
}
