use crate::block_table::block_table_entry::BlockTableEntry;
use crate::block_table::block_table_header::BlockTableHeader;
use crate::casc_file_frame::CascFileFrame;
use crate::casc_span_header::CascSpanHeader;
use crate::error::CascError;
use std::io::{Read, Seek, SeekFrom};
use tracing::trace;

/// Represents a span in a CASC file, including offsets and file frames.
///
/// A `CascFileSpan` holds the frames reconstructing one encoding key's stored bytes. Spans of
/// a multi-key file are concatenated, so virtual offsets continue from the previous span.
#[derive(Debug, Clone)]
pub struct CascFileSpan {
    /// The archive (`data.NNN`) holding the span.
    pub archive_index: u32,
    /// The virtual start offset of the span.
    pub virtual_start_offset: u64,
    /// The virtual end offset of the span.
    pub virtual_end_offset: u64,
    /// The archive offset of the first frame.
    pub archive_offset: u64,
    /// The file frames within this span.
    pub frames: Vec<CascFileFrame>,
}

impl CascFileSpan {
    /// Decodes the block table at `offset` of an archive.
    ///
    /// # Arguments
    ///
    /// * `reader` - The archive, positioned anywhere.
    /// * `archive_index` - The number of the archive being read.
    /// * `offset` - The offset of the span header, as given by the index.
    /// * `virtual_start` - The virtual offset the first frame starts at.
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        archive_index: u32,
        offset: u64,
        virtual_start: u64,
    ) -> Result<Self, CascError> {
        reader.seek(SeekFrom::Start(offset))?;

        let span_header = CascSpanHeader::read(reader)?;
        let header = BlockTableHeader::read(reader)?;

        if !header.is_valid() {
            return Err(CascError::InvalidData(format!(
                "Invalid Block Table Header signature: {:02X?}",
                header.signature
            )));
        }
        if header.header_size == 0 {
            return Err(CascError::EmptyContent(format!(
                "Block table at data.{archive_index:03}:{offset:#x} has no frame table"
            )));
        }

        trace!(
            "Block table at data.{:03}:{:#x}: span size {}, flags {:#x}, format {:#x}, {} frames",
            archive_index,
            offset,
            span_header.content_size,
            span_header.flags,
            header.table_format,
            header.frame_count
        );

        let entries = (0..header.frame_count)
            .map(|_| BlockTableEntry::read(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let span_archive_offset = offset
            + (CascSpanHeader::SIZE
                + BlockTableHeader::SIZE
                + BlockTableEntry::SIZE * entries.len()) as u64;
        let mut archive_offset = span_archive_offset;
        let mut virtual_offset = virtual_start;
        let mut frames = Vec::with_capacity(entries.len());

        for entry in entries {
            frames.push(CascFileFrame {
                virtual_start_offset: virtual_offset,
                virtual_end_offset: virtual_offset + entry.content_size as u64,
                archive_offset,
                encoded_size: entry.encoded_size,
                content_size: entry.content_size,
                hash: entry.hash,
            });
            archive_offset += entry.encoded_size as u64;
            virtual_offset += entry.content_size as u64;
        }

        Ok(Self {
            archive_index,
            virtual_start_offset: virtual_start,
            virtual_end_offset: virtual_offset,
            archive_offset: span_archive_offset,
            frames,
        })
    }

    /// The decoded length of the span.
    pub fn len(&self) -> u64 {
        self.virtual_end_offset - self.virtual_start_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: u64) -> bool {
        position >= self.virtual_start_offset && position < self.virtual_end_offset
    }

    /// Finds the frame covering `position`, trying `hint` and its successor first.
    pub(crate) fn find_frame(&self, position: u64, hint: Option<usize>) -> Option<usize> {
        if let Some(hint) = hint {
            for index in [hint, hint + 1] {
                if self.frames.get(index).is_some_and(|f| f.contains(position)) {
                    return Some(index);
                }
            }
        }
        self.frames.iter().position(|f| f.contains(position))
    }
}
