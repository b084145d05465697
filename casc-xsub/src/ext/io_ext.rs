use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::utility::bit_packing;

pub trait ReadExt: Read + Seek {
    fn peek_byte(&mut self) -> io::Result<u8>;

    fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>>;

    fn read_u24_be(&mut self) -> io::Result<u32>;

    fn read_variable_be(&mut self, width: usize) -> io::Result<u32>;
}

impl<T> ReadExt for T
where
    T: Read + Seek,
{
    /// Peeks a single byte from the reader without advancing its position.
    fn peek_byte(&mut self) -> io::Result<u8> {
        let pos = self.stream_position()?;
        let mut buf = [0u8; 1];
        let n = self.read(&mut buf)?;
        self.seek(SeekFrom::Start(pos))?;
        if n == 0 {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF"))
        } else {
            Ok(buf[0])
        }
    }

    /// Reads exactly `count` bytes into a new buffer.
    ///
    /// The buffer only grows as data arrives, so a bogus `count` fails at the end of the
    /// stream instead of allocating up front.
    fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>> {
        let mut result: Vec<u8> = Vec::new();
        self.by_ref().take(count as u64).read_to_end(&mut result)?;
        if result.len() != count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Expected {count} bytes, stream held {}", result.len()),
            ));
        }
        Ok(result)
    }

    /// Reads a 3 byte big-endian integer.
    fn read_u24_be(&mut self) -> io::Result<u32> {
        self.read_variable_be(3)
    }

    /// Reads a big-endian integer of 1 to 4 bytes.
    fn read_variable_be(&mut self, width: usize) -> io::Result<u32> {
        if !(1..=4).contains(&width) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid integer width {width}"),
            ));
        }
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf[..width])?;
        Ok(bit_packing::read_be_uint(&buf[..width]) as u32)
    }
}

/// Utility methods for working with seekable streams.
pub trait SeekExt: Seek {
    /// Skips over the given number of bytes from the current position.
    fn skip<P: Copy + 'static>(&mut self, size: P) -> io::Result<u64>
    where
        i64: TryFrom<P>;
}

impl<T> SeekExt for T
where
    T: Seek,
{
    fn skip<P: Copy + 'static>(&mut self, size: P) -> io::Result<u64>
    where
        i64: TryFrom<P>,
    {
        let size = i64::try_from(size).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;

        self.seek(SeekFrom::Current(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn peek_does_not_advance() {
        let mut cursor = Cursor::new(vec![7u8, 8]);
        assert_eq!(cursor.peek_byte().unwrap(), 7);
        assert_eq!(cursor.position(), 0);
        cursor.skip(2u32).unwrap();
        assert_eq!(
            cursor.peek_byte().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn reads_variable_width_integers() {
        let mut cursor = Cursor::new(vec![0x01, 0x02, 0x03, 0xAB, 0xCD, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(cursor.read_u24_be().unwrap(), 0x010203);
        assert_eq!(cursor.read_variable_be(2).unwrap(), 0xABCD);
        assert_eq!(cursor.read_variable_be(4).unwrap(), 0x12345678);
        assert!(cursor.read_variable_be(5).is_err());
    }

    #[test]
    fn read_bytes_fails_on_short_input() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(cursor.read_bytes(2).unwrap(), vec![1, 2]);
        assert!(cursor.read_bytes(2).is_err());
    }

    #[test]
    fn read_bytes_does_not_trust_oversized_counts() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let err = cursor.read_bytes(0xFFFF_FFF0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
